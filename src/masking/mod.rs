//! Dynamic data masking
//!
//! A masking level is resolved from (role, risk level) by a fixed precedence
//! table and applied field-by-field to schema-less rows.

pub mod classifier;
pub mod masker;

use serde::Serialize;

use crate::models::Role;
use crate::risk::RiskLevel;

/// Strictness tier applied to a result set. Total order backs the
/// "risk always wins" comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskingLevel {
    None,
    Low,
    Medium,
    High,
}

impl MaskingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Map (role, risk level) to a masking level.
///
/// Precedence:
/// 1. High risk masks fully regardless of role.
/// 2. Medium risk is role-dependent; admin escalates to high, since
///    elevated risk on the most sensitive account gets the strictest
///    treatment.
/// 3. Low/no risk falls back to the pure role default.
///
/// Total over every (role, level) combination; unknown roles were already
/// folded into guest at parse time.
pub fn resolve_mask_level(role: Role, risk: RiskLevel) -> MaskingLevel {
    if risk == RiskLevel::High {
        return MaskingLevel::High;
    }

    if risk == RiskLevel::Medium {
        return match role {
            Role::Admin => MaskingLevel::High,
            Role::Analyst => MaskingLevel::Medium,
            _ => MaskingLevel::High,
        };
    }

    // Low / none risk: role defaults. Only here is admin fully unmasked.
    match role {
        Role::Admin => MaskingLevel::None,
        Role::Analyst => MaskingLevel::Low,
        Role::User => MaskingLevel::Medium,
        Role::Guest | Role::Threat => MaskingLevel::High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [Role; 5] = [Role::Admin, Role::Analyst, Role::User, Role::Guest, Role::Threat];
    const LEVELS: [RiskLevel; 4] = [RiskLevel::None, RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    #[test]
    fn test_resolver_is_total_and_deterministic() {
        for role in ROLES {
            for level in LEVELS {
                let first = resolve_mask_level(role, level);
                assert_eq!(first, resolve_mask_level(role, level));
            }
        }
    }

    #[test]
    fn test_high_risk_wins_for_every_role() {
        for role in ROLES {
            assert_eq!(resolve_mask_level(role, RiskLevel::High), MaskingLevel::High);
        }
    }

    #[test]
    fn test_medium_risk_table() {
        assert_eq!(resolve_mask_level(Role::Admin, RiskLevel::Medium), MaskingLevel::High);
        assert_eq!(resolve_mask_level(Role::Analyst, RiskLevel::Medium), MaskingLevel::Medium);
        assert_eq!(resolve_mask_level(Role::User, RiskLevel::Medium), MaskingLevel::High);
        assert_eq!(resolve_mask_level(Role::Guest, RiskLevel::Medium), MaskingLevel::High);
        assert_eq!(resolve_mask_level(Role::Threat, RiskLevel::Medium), MaskingLevel::High);
    }

    #[test]
    fn test_low_and_none_risk_use_role_defaults() {
        for risk in [RiskLevel::None, RiskLevel::Low] {
            assert_eq!(resolve_mask_level(Role::Admin, risk), MaskingLevel::None);
            assert_eq!(resolve_mask_level(Role::Analyst, risk), MaskingLevel::Low);
            assert_eq!(resolve_mask_level(Role::User, risk), MaskingLevel::Medium);
            assert_eq!(resolve_mask_level(Role::Guest, risk), MaskingLevel::High);
            assert_eq!(resolve_mask_level(Role::Threat, risk), MaskingLevel::High);
        }
    }

    #[test]
    fn test_monotonic_in_risk_except_admin_escalation() {
        // For every role except admin, masking never loosens as risk grows.
        for role in ROLES {
            if role == Role::Admin {
                continue;
            }
            let mut previous = resolve_mask_level(role, RiskLevel::None);
            for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High] {
                let current = resolve_mask_level(role, level);
                assert!(current >= previous, "{:?} loosened at {:?}", role, level);
                previous = current;
            }
        }

        // Admin jumps straight from none to high at medium risk; the table
        // escalates instead of stepping through medium.
        assert_eq!(resolve_mask_level(Role::Admin, RiskLevel::Low), MaskingLevel::None);
        assert_eq!(resolve_mask_level(Role::Admin, RiskLevel::Medium), MaskingLevel::High);
    }

    #[test]
    fn test_masking_level_order() {
        assert!(MaskingLevel::None < MaskingLevel::Low);
        assert!(MaskingLevel::Low < MaskingLevel::Medium);
        assert!(MaskingLevel::Medium < MaskingLevel::High);
    }
}
