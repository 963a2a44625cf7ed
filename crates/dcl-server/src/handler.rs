use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::NaiveDate;
use dcl_ledger::{
    AuditReport, BalanceView, CessionId, CessionOutcome, CessionRecord, CorrectUsage,
    CreateCession, CreditStore, DeclareUsage, ReverseCession, RolloverReport, UsageCategory, UsageId,
    UsageOutcome, UsageRecord,
};
use dcl_types::{
    CreditMonth, Hours, MembershipStatus, Representative, RepresentativeClass, RepresentativeId,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `PUT /v1/representatives/:id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepresentativeBody {
    pub name: String,
    pub class: RepresentativeClass,
    pub status: MembershipStatus,
    pub mandate_start: NaiveDate,
    #[serde(default)]
    pub mandate_end: Option<NaiveDate>,
    #[serde(default)]
    pub archived: bool,
}

/// Body of `POST /v1/representatives/:id/usage`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsageBody {
    pub date: NaiveDate,
    pub hours: Hours,
    pub category: UsageCategory,
    #[serde(default)]
    pub justification: Option<String>,
}

// ---------------------------------------------------------------------------
// Path parsing
// ---------------------------------------------------------------------------

fn representative_id(raw: &str) -> ServerResult<RepresentativeId> {
    Ok(raw.parse()?)
}

fn usage_id(raw: &str) -> ServerResult<UsageId> {
    raw.parse()
        .map_err(|e| ServerError::BadRequest(format!("usage id {raw:?}: {e}")))
}

fn cession_id(raw: &str) -> ServerResult<CessionId> {
    raw.parse()
        .map_err(|e| ServerError::BadRequest(format!("cession id {raw:?}: {e}")))
}

fn usage_response(outcome: UsageOutcome) -> (StatusCode, Json<UsageOutcome>) {
    let status = match &outcome {
        UsageOutcome::Committed { .. } => StatusCode::CREATED,
        UsageOutcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(outcome))
}

fn cession_response(outcome: CessionOutcome) -> (StatusCode, Json<CessionOutcome>) {
    let status = match &outcome {
        CessionOutcome::Committed { .. } => StatusCode::CREATED,
        CessionOutcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CessionOutcome::ConfirmationRequired { .. } => StatusCode::CONFLICT,
    };
    (status, Json(outcome))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "name": "dcl-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn put_representative(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RepresentativeBody>,
) -> ServerResult<Json<Representative>> {
    let representative = Representative {
        id: representative_id(&id)?,
        name: body.name,
        class: body.class,
        status: body.status,
        mandate_start: body.mandate_start,
        mandate_end: body.mandate_end,
        archived: body.archived,
    };
    let stored = state
        .write(|ledger| Ok(ledger.designate(representative)?))
        .await?;
    Ok(Json(stored))
}

pub async fn get_representative(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Representative>> {
    Ok(Json(state.ledger.representative(&representative_id(&id)?)?))
}

pub async fn get_balance(
    State(state): State<AppState>,
    Path((id, month)): Path<(String, String)>,
) -> ServerResult<Json<BalanceView>> {
    let id = representative_id(&id)?;
    let month: CreditMonth = month.parse()?;
    // The first read of a month opens it.
    if state.ledger.store().period(&id, month)?.is_some() {
        return Ok(Json(state.ledger.delegate_balance(&id, month)?));
    }
    let view = state
        .write(|ledger| Ok(ledger.delegate_balance(&id, month)?))
        .await?;
    Ok(Json(view))
}

pub async fn post_usage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UsageBody>,
) -> ServerResult<(StatusCode, Json<UsageOutcome>)> {
    let request = DeclareUsage {
        representative: representative_id(&id)?,
        date: body.date,
        hours: body.hours,
        category: body.category,
        justification: body.justification,
    };
    let outcome = state
        .write(|ledger| Ok(ledger.declare_usage(&request)?))
        .await?;
    Ok(usage_response(outcome))
}

pub async fn approve_usage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<UsageRecord>> {
    let id = usage_id(&id)?;
    let record = state.write(|ledger| Ok(ledger.approve_usage(&id)?)).await?;
    Ok(Json(record))
}

pub async fn correct_usage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CorrectUsage>,
) -> ServerResult<(StatusCode, Json<UsageOutcome>)> {
    let id = usage_id(&id)?;
    let outcome = state
        .write(|ledger| Ok(ledger.correct_usage(&id, &body)?))
        .await?;
    Ok(usage_response(outcome))
}

pub async fn post_cession(
    State(state): State<AppState>,
    Json(body): Json<CreateCession>,
) -> ServerResult<(StatusCode, Json<CessionOutcome>)> {
    let outcome = state
        .write(|ledger| Ok(ledger.create_cession(&body)?))
        .await?;
    Ok(cession_response(outcome))
}

pub async fn reverse_cession(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ReverseCession>,
) -> ServerResult<(StatusCode, Json<CessionOutcome>)> {
    let id = cession_id(&id)?;
    let outcome = state
        .write(|ledger| Ok(ledger.reverse_cession(&id, &body)?))
        .await?;
    Ok(cession_response(outcome))
}

pub async fn get_cessions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Vec<CessionRecord>>> {
    Ok(Json(
        state.ledger.cession_history(&representative_id(&id)?)?,
    ))
}

pub async fn post_rollover(
    State(state): State<AppState>,
    Path(month): Path<String>,
) -> ServerResult<Json<RolloverReport>> {
    let month: CreditMonth = month.parse()?;
    let report = state.write(|ledger| Ok(ledger.rollover(month)?)).await?;
    Ok(Json(report))
}

pub async fn get_audit(State(state): State<AppState>) -> ServerResult<Json<AuditReport>> {
    Ok(Json(state.ledger.audit()?))
}
