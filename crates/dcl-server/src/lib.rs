//! HTTP server for the delegation credit ledger.
//!
//! Exposes representative designation, monthly balances, usage declarations
//! and cessions as a JSON API. The ledger lives in memory and is written to
//! an optional state file after every committed change.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::DclServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use chrono::NaiveDate;
    use dcl_ledger::{CreditStore, DelegationLedger, InMemoryLedger, LedgerConfig};
    use dcl_types::{CreditMonth, FixedClock, RepresentativeId};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn ledger_at(today: NaiveDate) -> DelegationLedger<InMemoryLedger> {
        DelegationLedger::with_clock(
            InMemoryLedger::new(),
            LedgerConfig::default(),
            Arc::new(FixedClock::new(today)),
        )
        .unwrap()
    }

    fn app_at(today: NaiveDate) -> Router {
        router::build_router(AppState::new(ledger_at(today), None))
    }

    fn march_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn app() -> Router {
        app_at(march_first())
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn designate(app: &Router, id: &str, status: &str) {
        let (code, _) = send(
            app,
            Method::PUT,
            &format!("/v1/representatives/{id}"),
            Some(json!({
                "name": format!("Rep {id}"),
                "class": "council_member",
                "status": status,
                "mandate_start": "2024-01-01",
            })),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (status, body) = send(&app(), Method::GET, "/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn balance_of_new_representative() {
        let app = app();
        designate(&app, "EMP-1", "titular").await;

        let (status, body) = send(
            &app,
            Method::GET,
            "/v1/representatives/EMP-1/balance/2024-03",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // 22h council base at the default headcount, in minutes.
        assert_eq!(body["balance"]["available"], 22 * 60);
    }

    #[tokio::test]
    async fn unknown_representative_is_404() {
        let (status, body) = send(
            &app(),
            Method::GET,
            "/v1/representatives/NOBODY/balance/2024-03",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn malformed_month_is_400() {
        let app = app();
        designate(&app, "EMP-1", "titular").await;
        let (status, _) = send(
            &app,
            Method::GET,
            "/v1/representatives/EMP-1/balance/march",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn usage_commits_then_rejects_invalid_hours() {
        let app = app();
        designate(&app, "EMP-1", "titular").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/representatives/EMP-1/usage",
            Some(json!({"date": "2024-03-05", "hours": "3h", "category": "meeting"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "committed");
        assert_eq!(body["balance"]["balance"]["available"], 19 * 60);

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/representatives/EMP-1/usage",
            Some(json!({"date": "2024-03-06", "hours": 0, "category": "meeting"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], "rejected");
    }

    #[tokio::test]
    async fn cession_flow_and_reversal() {
        let app = app();
        designate(&app, "EMP-1", "titular").await;
        designate(&app, "EMP-2", "substitute").await;

        let request = json!({
            "donor": "EMP-1",
            "beneficiary": {"kind": "internal", "id": "EMP-2"},
            "hours": "4h",
            "effective_date": "2024-03-20",
            "reason": "committee meeting",
        });
        let (status, body) = send(&app, Method::POST, "/v1/cessions", Some(request)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["record"]["id"].as_str().unwrap().to_string();

        let (_, history) = send(
            &app,
            Method::GET,
            "/v1/representatives/EMP-2/cessions",
            None,
        )
        .await;
        assert_eq!(history.as_array().unwrap().len(), 1);

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/v1/cessions/{id}/reverse"),
            Some(json!({"reason": "meeting cancelled"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/v1/cessions/{id}/reverse"),
            Some(json!({"reason": "again"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], "rejected");

        let (status, audit) = send(&app, Method::GET, "/v1/audit", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(audit["breaches"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn short_notice_requires_confirmation() {
        let app = app();
        designate(&app, "EMP-1", "titular").await;
        designate(&app, "EMP-2", "titular").await;

        let mut request = json!({
            "donor": "EMP-1",
            "beneficiary": {"kind": "internal", "id": "EMP-2"},
            "hours": "2h",
            "effective_date": "2024-03-04",
            "reason": "urgent negotiation",
        });
        let (status, body) = send(&app, Method::POST, "/v1/cessions", Some(request.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], "confirmation_required");

        request["force_override_notice"] = json!(true);
        let (status, _) = send(&app, Method::POST, "/v1/cessions", Some(request)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn approve_twice_is_conflict() {
        let app = app();
        designate(&app, "EMP-1", "titular").await;
        let (_, body) = send(
            &app,
            Method::POST,
            "/v1/representatives/EMP-1/usage",
            Some(json!({"date": "2024-03-05", "hours": 120, "category": "training"})),
        )
        .await;
        let id = body["record"]["id"].as_str().unwrap().to_string();
        let uri = format!("/v1/usage/{id}/approve");

        let (status, _) = send(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "invalid_transition");
    }

    #[tokio::test]
    async fn rollover_opens_periods() {
        let app = app();
        designate(&app, "EMP-1", "titular").await;
        designate(&app, "EMP-2", "titular").await;

        let (status, body) = send(&app, Method::POST, "/v1/periods/2024-04/rollover", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["opened"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn committed_writes_reach_the_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let app = router::build_router(AppState::new(ledger_at(march_first()), Some(path.clone())));
        designate(&app, "EMP-1", "titular").await;

        let reloaded = InMemoryLedger::load(&path).unwrap();
        assert_eq!(reloaded.snapshot().unwrap().representatives.len(), 1);
    }

    #[tokio::test]
    async fn failed_state_write_rolls_the_commit_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let state = AppState::new(ledger_at(march_first()), Some(path.clone()));
        let app = router::build_router(state.clone());
        designate(&app, "EMP-1", "titular").await;
        designate(&app, "EMP-2", "titular").await;

        // A directory in place of the file makes every later write fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let request = json!({
            "donor": "EMP-1",
            "beneficiary": {"kind": "internal", "id": "EMP-2"},
            "hours": "4h",
            "effective_date": "2024-03-20",
            "reason": "committee meeting",
        });
        let (status, body) = send(&app, Method::POST, "/v1/cessions", Some(request)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "storage");

        let donor = RepresentativeId::new("EMP-1").unwrap();
        assert!(state.ledger.cession_history(&donor).unwrap().is_empty());
        let march = CreditMonth::new(2024, 3).unwrap();
        assert!(state.ledger.store().period(&donor, march).unwrap().is_none());

        let (status, _) = send(
            &app,
            Method::PUT,
            "/v1/representatives/EMP-3",
            Some(json!({
                "name": "Rep EMP-3",
                "class": "council_member",
                "status": "titular",
                "mandate_start": "2024-01-01",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let (status, _) = send(&app, Method::GET, "/v1/representatives/EMP-3", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn far_future_usage_is_422() {
        let app = app();
        designate(&app, "EMP-1", "titular").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/representatives/EMP-1/usage",
            Some(json!({"date": "9999-12-31", "hours": "1h", "category": "meeting"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "beyond_horizon");
    }
}
