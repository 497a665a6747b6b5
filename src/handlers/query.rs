//! Query handler - the full masking pipeline
//!
//! Per request: policy gates (threat role, destructive SQL) -> execute ->
//! risk assessment -> mask-level resolution -> row masking -> annotated
//! response. Masking is silent and non-negotiable: the caller is told what
//! level was applied but has no path to retry for a lower one.

use std::net::SocketAddr;
use std::sync::OnceLock;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use chrono::{Local, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db;
use crate::masking::classifier::KeywordClassifier;
use crate::masking::masker::RowMasker;
use crate::masking::{resolve_mask_level, MaskingLevel};
use crate::middleware::auth::UserContext;
use crate::models::Role;
use crate::risk::fingerprint::DeviceInfo;
use crate::risk::pipeline::RiskPipeline;
use crate::risk::{RiskContext, RiskLevel};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Client device descriptor, taken as-is and normalized leniently.
    /// A malformed descriptor is treated as no device supplied.
    #[serde(default)]
    pub device: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub role: Role,
    pub risk: RiskSummary,
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct RiskSummary {
    pub score: f64,
    pub level: RiskLevel,
    pub mask_level: MaskingLevel,
}

/// Run a read-only query and return the masked result set.
pub async fn run(
    State(state): State<AppState>,
    user: UserContext,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<QueryRequest>,
) -> AppResult<Json<QueryResponse>> {
    if let Err(denied) = deny_blocked_role(user.role) {
        tracing::warn!("Blocked query from threat-role user {}", user.user_id);
        return Err(denied);
    }

    let query = req.query.trim();
    if query.is_empty() {
        return Err(AppError::ValidationError("Missing 'query' in body".to_string()));
    }
    if is_destructive_query(query) {
        return Err(AppError::ValidationError(
            "Destructive queries (DROP, DELETE, ALTER, ...) are not allowed".to_string(),
        ));
    }

    let rows = sqlx::query(query).fetch_all(&state.pool).await?;
    let rows: Vec<Map<String, Value>> = rows.iter().map(db::row_to_json).collect();

    let ctx = RiskContext {
        user_id: user.user_id,
        role: user.role,
        client_ip: super::client_ip(&headers, peer),
        local_hour: Local::now().hour(),
        device: req.device.as_ref().and_then(DeviceInfo::from_value),
    };

    let assessment = RiskPipeline::new(&state.audit, &state.config.risk)
        .assess(&ctx)
        .await;
    let mask_level = resolve_mask_level(user.role, assessment.level);

    tracing::info!(
        user_id = %user.user_id,
        role = user.role.as_str(),
        score = assessment.score,
        risk_level = assessment.level.as_str(),
        mask_level = mask_level.as_str(),
        row_count = rows.len(),
        "query masked"
    );

    let classifier = KeywordClassifier::new();
    let masker = RowMasker::new(&classifier, state.config.masking.salary_bucket_width);
    let masked = masker.mask_rows(&rows, mask_level);

    Ok(Json(QueryResponse {
        role: user.role,
        risk: RiskSummary {
            score: assessment.score,
            level: assessment.level,
            mask_level,
        },
        rows: masked,
    }))
}

/// Hard policy gate: the threat role never reaches query execution,
/// whatever its risk score would have been. Runs before the statement
/// guard and before anything touches the database.
fn deny_blocked_role(role: Role) -> Result<(), AppError> {
    if role == Role::Threat {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Statement-keyword guard. The masking core assumes mutating SQL was
/// rejected before it runs; this is that gate.
fn is_destructive_query(sql: &str) -> bool {
    static FORBIDDEN: OnceLock<Regex> = OnceLock::new();
    let forbidden = FORBIDDEN.get_or_init(|| {
        Regex::new(r"(?i)\b(drop|delete|truncate|alter|update|insert|create|replace|grant|revoke)\b")
            .unwrap()
    });
    forbidden.is_match(sql)
}
