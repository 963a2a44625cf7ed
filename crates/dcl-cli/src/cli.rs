use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use dcl_ledger::UsageCategory;
use dcl_types::{CreditMonth, Hours, MembershipStatus, RepresentativeClass, RepresentativeId};

#[derive(Parser)]
#[command(
    name = "dcl",
    about = "Delegation credit ledger for employee representatives",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Server and ledger configuration (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON state file; overrides `state_path` from the configuration.
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Designate or update a representative
    Designate(DesignateArgs),
    /// End a representative's mandate
    Archive(ArchiveArgs),
    /// Show the balance of a representative for a month
    Balance(BalanceArgs),
    /// Declare delegation hours used
    Declare(DeclareArgs),
    /// Approve a pending usage declaration
    Approve(RecordArgs),
    /// Cancel a usage declaration with a compensating record
    Correct(CorrectArgs),
    /// Cede hours to another representative or an external beneficiary
    Cede(CedeArgs),
    /// Reverse a cession
    Reverse(ReverseArgs),
    /// Show cessions and usage of a representative
    History(HistoryArgs),
    /// Open every active representative's period for a month
    Rollover(RolloverArgs),
    /// Replay all records and check the period buckets
    Audit,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Overrides `bind_addr` from the configuration.
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args)]
pub struct DesignateArgs {
    pub id: RepresentativeId,
    #[arg(long)]
    pub name: String,
    #[arg(long, value_parser = parse_class)]
    pub class: RepresentativeClass,
    #[arg(long)]
    pub substitute: bool,
    /// First day of the mandate (YYYY-MM-DD).
    #[arg(long)]
    pub start: NaiveDate,
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

#[derive(Args)]
pub struct ArchiveArgs {
    pub id: RepresentativeId,
    /// Last day of the mandate.
    #[arg(long)]
    pub end: NaiveDate,
}

#[derive(Args)]
pub struct BalanceArgs {
    pub id: RepresentativeId,
    /// YYYY-MM; defaults to the current month.
    pub month: Option<CreditMonth>,
}

#[derive(Args)]
pub struct DeclareArgs {
    pub id: RepresentativeId,
    /// Hours used, e.g. `3h`, `1h30`, `2.5`.
    pub hours: Hours,
    #[arg(long)]
    pub date: NaiveDate,
    #[arg(long, value_parser = parse_category, default_value = "delegation")]
    pub category: UsageCategory,
    #[arg(long)]
    pub justification: Option<String>,
}

#[derive(Args)]
pub struct RecordArgs {
    pub id: String,
}

#[derive(Args)]
pub struct CorrectArgs {
    pub id: String,
    #[arg(short, long)]
    pub reason: String,
}

#[derive(Args)]
pub struct CedeArgs {
    pub donor: RepresentativeId,
    pub hours: Hours,
    /// Receiving representative.
    #[arg(long, conflicts_with = "external", required_unless_present = "external")]
    pub to: Option<RepresentativeId>,
    /// Name of a beneficiary outside the ledger.
    #[arg(long)]
    pub external: Option<String>,
    #[arg(long)]
    pub date: NaiveDate,
    #[arg(short, long, default_value = "")]
    pub reason: String,
    #[arg(long, default_value = "cli")]
    pub by: String,
    /// Commit despite a notice shortfall.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ReverseArgs {
    pub id: String,
    #[arg(short, long)]
    pub reason: String,
    #[arg(long, default_value = "cli")]
    pub by: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub id: RepresentativeId,
    /// Also list usage of this month.
    #[arg(long)]
    pub month: Option<CreditMonth>,
}

#[derive(Args)]
pub struct RolloverArgs {
    pub month: CreditMonth,
}

fn parse_class(raw: &str) -> Result<RepresentativeClass, String> {
    RepresentativeClass::ALL
        .into_iter()
        .find(|class| class.to_string() == raw)
        .ok_or_else(|| {
            let known: Vec<String> = RepresentativeClass::ALL.iter().map(|c| c.to_string()).collect();
            format!("unknown class {raw:?}, expected one of {}", known.join(", "))
        })
}

fn parse_category(raw: &str) -> Result<UsageCategory, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("unknown usage category {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_designate() {
        let cli = Cli::try_parse_from([
            "dcl",
            "designate",
            "EMP-7",
            "--name",
            "Ada",
            "--class",
            "union_delegate",
            "--start",
            "2024-01-01",
        ])
        .unwrap();
        if let Command::Designate(args) = cli.command {
            assert_eq!(args.id.as_str(), "EMP-7");
            assert_eq!(args.class, RepresentativeClass::UnionDelegate);
            assert!(!args.substitute);
            assert!(args.end.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_declare_hours_notation() {
        let cli = Cli::try_parse_from([
            "dcl", "declare", "EMP-1", "1h30", "--date", "2024-03-05", "--category", "training",
        ])
        .unwrap();
        if let Command::Declare(args) = cli.command {
            assert_eq!(args.hours, Hours::from_minutes(90));
            assert_eq!(args.category, UsageCategory::Training);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn cede_needs_a_beneficiary() {
        assert!(Cli::try_parse_from(["dcl", "cede", "EMP-1", "2h", "--date", "2024-03-20"]).is_err());
        assert!(Cli::try_parse_from([
            "dcl", "cede", "EMP-1", "2h", "--date", "2024-03-20", "--to", "EMP-2", "--external", "X",
        ])
        .is_err());

        let cli = Cli::try_parse_from([
            "dcl", "cede", "EMP-1", "2h", "--date", "2024-03-20", "--external", "Union office",
        ])
        .unwrap();
        if let Command::Cede(args) = cli.command {
            assert_eq!(args.external.as_deref(), Some("Union office"));
            assert!(!args.force);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_balance_month() {
        let cli = Cli::try_parse_from(["dcl", "balance", "EMP-1", "2024-03"]).unwrap();
        if let Command::Balance(args) = cli.command {
            assert_eq!(args.month, Some("2024-03".parse().unwrap()));
        } else {
            panic!("wrong command");
        }
        assert!(Cli::try_parse_from(["dcl", "balance", "EMP-1", "2024-13"]).is_err());
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "dcl", "--format", "json", "--state", "ledger.json", "-v", "audit",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.state, Some(PathBuf::from("ledger.json")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Audit));
    }

    #[test]
    fn unknown_class_is_rejected() {
        assert!(Cli::try_parse_from([
            "dcl", "designate", "EMP-7", "--name", "Ada", "--class", "mayor", "--start", "2024-01-01",
        ])
        .is_err());
    }
}
