//! Contextual risk assessment
//!
//! Signals are collected per request, combined into one score, bucketed into
//! a risk level, and handed to the masking resolver. Nothing here is stored;
//! the assessment is recomputed for every request from the audit history.

pub mod fingerprint;
pub mod pipeline;
pub mod scorer;
pub mod signals;

use serde::Serialize;
use uuid::Uuid;

use crate::models::Role;
use fingerprint::DeviceInfo;

/// Request-scoped context the signal collectors read from. Not persisted.
#[derive(Debug, Clone)]
pub struct RiskContext {
    pub user_id: Uuid,
    pub role: Role,
    pub client_ip: String,
    /// Local hour-of-day of the request, fixed at context build time so the
    /// assessment is deterministic for a given context.
    pub local_hour: u32,
    pub device: Option<DeviceInfo>,
}

/// One normalized value in [0, 1] per contextual signal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskSignals {
    pub ip_unknown: f64,
    pub time_anomaly: f64,
    pub failed_login_rate: f64,
    pub device_anomaly: f64,
    pub privilege_sensitivity: f64,
}

/// Coarse risk bucket derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Composite result of one scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
}
