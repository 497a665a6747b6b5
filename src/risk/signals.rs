//! Signal collectors
//!
//! Each collector derives one normalized value in [0, 1] from the request
//! context and the audit store, independently of the others. The fail-open
//! cases (no baseline, no descriptor) return 0; the tests pin down those
//! edge policies.

use chrono::Duration;
use uuid::Uuid;

use crate::audit::AuditStore;
use crate::config::RiskConfig;
use crate::models::Role;
use crate::risk::fingerprint::DeviceInfo;

/// 1.0 when the current IP is absent from the distinct IPs of the user's
/// last N successful logins. With no prior successful logins there is no
/// baseline to flag against, so the signal stays 0.
pub async fn ip_unknown(
    store: &dyn AuditStore,
    user_id: Uuid,
    client_ip: &str,
    lookback: u32,
) -> Result<f64, sqlx::Error> {
    let known = store.recent_successful_login_ips(user_id, lookback).await?;
    if known.is_empty() {
        return Ok(0.0);
    }
    Ok(if known.iter().any(|ip| ip == client_ip) { 0.0 } else { 1.0 })
}

/// 1.0 when the local hour falls outside business hours `[start, end)`.
pub fn time_anomaly(local_hour: u32, config: &RiskConfig) -> f64 {
    if local_hour >= config.business_hours_start && local_hour < config.business_hours_end {
        0.0
    } else {
        1.0
    }
}

/// Failed attempts in the trailing hour, normalized by the configured safe
/// cap and clamped to 1.0. The cap is validated > 0 at startup.
pub async fn failed_login_rate(
    store: &dyn AuditStore,
    user_id: Uuid,
    safe_cap: u32,
) -> Result<f64, sqlx::Error> {
    let count = store.failed_login_count(user_id, Duration::hours(1)).await?;
    let rate = count.max(0) as f64 / safe_cap as f64;
    Ok(rate.min(1.0))
}

/// 1.0 on the first sighting of a (user, fingerprint) pair. Registers the
/// device as a side effect; a known pair only bumps last_seen. No descriptor
/// means no signal - absence of data is not treated as evidence of anomaly.
pub async fn device_anomaly(
    store: &dyn AuditStore,
    user_id: Uuid,
    device: Option<&DeviceInfo>,
) -> Result<f64, sqlx::Error> {
    let Some(device) = device else {
        return Ok(0.0);
    };
    let was_new = store.upsert_device(user_id, &device.fingerprint()).await?;
    Ok(if was_new { 1.0 } else { 0.0 })
}

/// Fixed role-to-sensitivity lookup. Higher-privilege identities raise risk
/// because their exposure blast radius is larger.
pub fn privilege_sensitivity(role: Role) -> f64 {
    match role {
        Role::Admin => 1.0,
        Role::Analyst => 0.75,
        Role::User => 0.5,
        Role::Guest => 0.25,
        Role::Threat => 0.0,
    }
}
