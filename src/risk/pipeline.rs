//! Pipeline coordinator for signal collection and scoring
//!
//! The three store-backed collectors run concurrently and are joined before
//! the scorer runs. Each is bounded by a timeout and recovered individually:
//! a store fault or timeout substitutes 0 for that signal and the request
//! proceeds. No collector failure escalates past this boundary.

use std::future::Future;
use std::time::Duration;

use crate::audit::AuditStore;
use crate::config::RiskConfig;
use crate::risk::{scorer, signals, RiskAssessment, RiskContext, RiskSignals};

pub struct RiskPipeline<'a> {
    store: &'a dyn AuditStore,
    config: &'a RiskConfig,
}

impl<'a> RiskPipeline<'a> {
    pub fn new(store: &'a dyn AuditStore, config: &'a RiskConfig) -> Self {
        Self { store, config }
    }

    /// Run all collectors against the context and score the result.
    pub async fn assess(&self, ctx: &RiskContext) -> RiskAssessment {
        let signals = self.collect_signals(ctx).await;
        let assessment = scorer::assess(&signals, self.config);

        tracing::debug!(
            user_id = %ctx.user_id,
            score = assessment.score,
            level = assessment.level.as_str(),
            ?signals,
            "risk assessment computed"
        );

        assessment
    }

    async fn collect_signals(&self, ctx: &RiskContext) -> RiskSignals {
        let timeout = Duration::from_millis(self.config.collector_timeout_ms);

        let (ip_unknown, failed_login_rate, device_anomaly) = tokio::join!(
            guarded(
                "ip_unknown",
                timeout,
                signals::ip_unknown(
                    self.store,
                    ctx.user_id,
                    &ctx.client_ip,
                    self.config.recent_ip_lookback,
                ),
            ),
            guarded(
                "failed_login_rate",
                timeout,
                signals::failed_login_rate(
                    self.store,
                    ctx.user_id,
                    self.config.failed_login_safe_cap,
                ),
            ),
            guarded(
                "device_anomaly",
                timeout,
                signals::device_anomaly(self.store, ctx.user_id, ctx.device.as_ref()),
            ),
        );

        RiskSignals {
            ip_unknown,
            time_anomaly: signals::time_anomaly(ctx.local_hour, self.config),
            failed_login_rate,
            device_anomaly,
            privilege_sensitivity: signals::privilege_sensitivity(ctx.role),
        }
    }
}

/// Bound a collector by a timeout and substitute the neutral signal on any
/// fault. Logged for operational visibility, invisible to the caller.
async fn guarded<F>(name: &str, timeout: Duration, collector: F) -> f64
where
    F: Future<Output = Result<f64, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, collector).await {
        Ok(Ok(signal)) => signal,
        Ok(Err(err)) => {
            tracing::warn!("Signal collector '{}' failed, defaulting to 0: {}", name, err);
            0.0
        }
        Err(_) => {
            tracing::warn!("Signal collector '{}' timed out, defaulting to 0", name);
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::testing::MemoryAuditStore;
    use crate::models::Role;
    use crate::risk::fingerprint::DeviceInfo;
    use crate::risk::RiskLevel;
    use uuid::Uuid;

    fn context(role: Role, device: Option<DeviceInfo>) -> RiskContext {
        RiskContext {
            user_id: Uuid::new_v4(),
            role,
            client_ip: "203.0.113.9".to_string(),
            local_hour: 12, // inside business hours
            device,
        }
    }

    fn device() -> DeviceInfo {
        DeviceInfo::from_value(&serde_json::json!({
            "userAgent": "Mozilla/5.0",
            "platform": "Linux x86_64",
            "language": "en-US",
            "timezone": "UTC",
            "screenWidth": 1920,
            "screenHeight": 1080
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_assessment_is_deterministic_for_fixed_context() {
        let store = MemoryAuditStore {
            known_ips: vec!["10.0.0.1".into()],
            failed_logins: 2,
            ..Default::default()
        };
        let cfg = RiskConfig::for_tests();
        let pipeline = RiskPipeline::new(&store, &cfg);
        let ctx = context(Role::User, None);

        let first = pipeline.assess(&ctx).await;
        let second = pipeline.assess(&ctx).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_privilege_and_time_only() {
        let store = MemoryAuditStore {
            unavailable: true,
            ..Default::default()
        };
        let cfg = RiskConfig::for_tests();
        let pipeline = RiskPipeline::new(&store, &cfg);

        // Store-backed signals default to 0; the pure signals still count.
        // admin privilege 1.0 * weight 0.40 => score 0.40, level low.
        let assessment = pipeline.assess(&context(Role::Admin, Some(device()))).await;
        assert_eq!(assessment.score, 0.40);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_stalled_store_times_out_and_defaults_to_zero() {
        // A store that never answers in time must not block the request:
        // each collector is cut off at the configured timeout and its
        // signal defaults to 0, same as a store error.
        let store = MemoryAuditStore {
            known_ips: vec!["10.0.0.1".into()], // would fire ip_unknown
            failed_logins: 10,                  // would clamp to 1.0
            stall: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        let mut cfg = RiskConfig::for_tests();
        cfg.collector_timeout_ms = 20;
        let pipeline = RiskPipeline::new(&store, &cfg);

        // Only the pure signals survive: admin privilege 1.0 * 0.40.
        let assessment = pipeline.assess(&context(Role::Admin, Some(device()))).await;
        assert_eq!(assessment.score, 0.40);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_device_novelty_raises_first_request_only() {
        let store = MemoryAuditStore {
            known_ips: vec!["203.0.113.9".into()],
            ..Default::default()
        };
        let cfg = RiskConfig::for_tests();
        let pipeline = RiskPipeline::new(&store, &cfg);

        let mut ctx = context(Role::Guest, Some(device()));
        let first = pipeline.assess(&ctx).await;

        // Same user, cosmetically different descriptor (normalized equal).
        ctx.device = Some(device());
        let second = pipeline.assess(&ctx).await;

        // guest 0.25 * 0.40 = 0.10; device adds 0.10 on the first pass only.
        assert_eq!(first.score, 0.20);
        assert_eq!(second.score, 0.10);
    }

    #[tokio::test]
    async fn test_compound_signals_reach_high() {
        let store = MemoryAuditStore {
            known_ips: vec!["10.0.0.1".into()], // current IP is novel
            failed_logins: 10,                  // clamps to 1.0
            ..Default::default()
        };
        let cfg = RiskConfig::for_tests();
        let pipeline = RiskPipeline::new(&store, &cfg);

        let mut ctx = context(Role::Admin, Some(device()));
        ctx.local_hour = 3; // outside business hours

        // 0.20 + 0.10 + 0.20 + 0.10 + 0.40 = 1.0
        let assessment = pipeline.assess(&ctx).await;
        assert_eq!(assessment.score, 1.0);
        assert_eq!(assessment.level, RiskLevel::High);
    }
}
