//! Risk scorer
//!
//! Weighted sum over the five signals, clamped to [0, 1] and rounded to two
//! decimal places so repeated assessments of the same context produce the
//! same score on any float environment.

use crate::config::RiskConfig;
use crate::risk::{RiskAssessment, RiskLevel, RiskSignals};

/// Combine signals into one composite score.
pub fn score(signals: &RiskSignals, config: &RiskConfig) -> f64 {
    let raw = config.weight_ip_unknown * signals.ip_unknown
        + config.weight_time_anomaly * signals.time_anomaly
        + config.weight_failed_logins * signals.failed_login_rate
        + config.weight_device * signals.device_anomaly
        + config.weight_privilege * signals.privilege_sensitivity;

    round2(raw.clamp(0.0, 1.0))
}

/// Bucket a score by the configured ascending thresholds.
pub fn level_for(score: f64, config: &RiskConfig) -> RiskLevel {
    if score >= config.threshold_high {
        RiskLevel::High
    } else if score >= config.threshold_medium {
        RiskLevel::Medium
    } else if score >= config.threshold_low {
        RiskLevel::Low
    } else {
        RiskLevel::None
    }
}

pub fn assess(signals: &RiskSignals, config: &RiskConfig) -> RiskAssessment {
    let score = score(signals, config);
    RiskAssessment {
        score,
        level: level_for(score, config),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
