use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use dcl_ledger::LedgerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// JSON state file loaded at startup and rewritten after every commit.
    /// `None` keeps the ledger in memory only.
    pub state_path: Option<PathBuf>,
    pub ledger: LedgerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8484)),
            state_path: None,
            ledger: LedgerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read a TOML configuration file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.ledger.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcl_compliance::OveragePolicy;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8484".parse::<SocketAddr>().unwrap());
        assert!(c.state_path.is_none());
        assert_eq!(c.ledger, LedgerConfig::default());
    }

    #[test]
    fn load_nested_ledger_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dcl.toml");
        std::fs::write(
            &path,
            r#"
            bind_addr = "0.0.0.0:9000"
            state_path = "/var/lib/dcl/state.json"

            [ledger]
            company_headcount = 120

            [ledger.policy]
            overage = "block"
            "#,
        )
        .unwrap();

        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.state_path, Some(PathBuf::from("/var/lib/dcl/state.json")));
        assert_eq!(c.ledger.company_headcount, 120);
        assert_eq!(c.ledger.policy.overage, OveragePolicy::Block);
        assert_eq!(c.ledger.policy.notice_days, 8);
    }

    #[test]
    fn invalid_policy_is_a_config_error() {
        let err = ServerConfig::from_toml(
            r#"
            [ledger.policy]
            recipient_cap_percent = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ServerError::Ledger(_)));
    }

    #[test]
    fn shipped_example_matches_defaults() {
        let c = ServerConfig::from_toml(include_str!("../../../config/dcl.example.toml")).unwrap();
        assert_eq!(c.ledger, LedgerConfig::default());
        assert_eq!(c.state_path, Some(PathBuf::from("dcl-state.json")));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(matches!(
            ServerConfig::from_toml("bind_addr = 12"),
            Err(ServerError::Config(_))
        ));
    }
}
