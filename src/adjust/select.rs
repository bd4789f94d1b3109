//! Selection policy for the adjustment method.
//!
//! Given the analysis goal and the signals available from the data (π0, a
//! caller-supplied dependence hint), pick a default correction procedure
//! and record a human-readable justification. The rules are evaluated in a
//! fixed order so the choice is deterministic.

use crate::adjust::AdjustMethod;
use crate::goal::{Goal, GoalPolicy};
use crate::pi0::Pi0Estimate;
use serde::{Deserialize, Serialize};

/// π0 below which Storey's q-values gain enough power to be worth the
/// extra estimation step.
const STOREY_PI0_THRESHOLD: f64 = 0.8;

/// A selected adjustment method with its justification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustSelection {
    /// The procedure to apply.
    pub method: AdjustMethod,
    /// Why it was chosen (or substituted).
    pub reasoning: String,
}

/// Choose a correction procedure for this data and goal.
///
/// Rules, in order: Storey when π0 < 0.8 and the goal is discovery; BY when
/// the caller flags possible negative correlation between features; Holm
/// for validation; BH otherwise.
pub fn select_method(
    policy: &GoalPolicy,
    pi0: &Pi0Estimate,
    negatively_correlated: bool,
) -> AdjustSelection {
    if policy.goal == Goal::Discovery {
        if let Some(pi0_value) = pi0.value {
            if pi0_value < STOREY_PI0_THRESHOLD {
                return AdjustSelection {
                    method: AdjustMethod::Storey,
                    reasoning: format!(
                        "Storey q-values selected: strong signal (pi0 = {:.3} < {}) \
                         and discovery goal favor the most powerful FDR procedure",
                        pi0_value, STOREY_PI0_THRESHOLD
                    ),
                };
            }
        }
    }

    if negatively_correlated {
        return AdjustSelection {
            method: AdjustMethod::By,
            reasoning: "BY selected: caller indicated features may be negatively \
                        correlated, requiring FDR control under arbitrary dependence"
                .to_string(),
        };
    }

    if policy.goal == Goal::Validation {
        return AdjustSelection {
            method: AdjustMethod::Holm,
            reasoning: "Holm selected: validation goal calls for family-wise error \
                        control"
                .to_string(),
        };
    }

    AdjustSelection {
        method: AdjustMethod::Bh,
        reasoning: format!(
            "BH selected: standard FDR control for {} goal with no dependence \
             concerns",
            policy.goal
        ),
    }
}

/// Substitute BH for an explicit Storey request when π0 is undefined.
///
/// Returns the method to actually run plus a note for the reasoning text
/// when a substitution happened.
pub fn resolve_storey(method: AdjustMethod, pi0: &Pi0Estimate) -> (AdjustMethod, Option<String>) {
    if method == AdjustMethod::Storey && pi0.value.is_none() {
        (
            AdjustMethod::Bh,
            Some(
                "Storey requested but pi0 could not be estimated; fell back to BH"
                    .to_string(),
            ),
        )
    } else {
        (method, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pi0::Pi0Method;

    fn pi0_of(value: Option<f64>) -> Pi0Estimate {
        Pi0Estimate {
            value,
            method: match value {
                Some(_) => Pi0Method::Smoother,
                None => Pi0Method::Undefined,
            },
            n_used: 1000,
            reasoning: String::new(),
        }
    }

    #[test]
    fn test_storey_for_discovery_with_signal() {
        let sel = select_method(&GoalPolicy::new(Goal::Discovery), &pi0_of(Some(0.6)), false);
        assert_eq!(sel.method, AdjustMethod::Storey);
        assert!(sel.reasoning.contains("pi0"));
    }

    #[test]
    fn test_discovery_weak_signal_falls_through() {
        let sel = select_method(&GoalPolicy::new(Goal::Discovery), &pi0_of(Some(0.95)), false);
        assert_eq!(sel.method, AdjustMethod::Bh);
    }

    #[test]
    fn test_by_for_negative_correlation() {
        let sel = select_method(&GoalPolicy::new(Goal::Balanced), &pi0_of(Some(0.6)), true);
        assert_eq!(sel.method, AdjustMethod::By);
    }

    #[test]
    fn test_storey_beats_dependence_hint_for_discovery() {
        // Rules are evaluated in spec order: the Storey rule fires first.
        let sel = select_method(&GoalPolicy::new(Goal::Discovery), &pi0_of(Some(0.5)), true);
        assert_eq!(sel.method, AdjustMethod::Storey);
    }

    #[test]
    fn test_holm_for_validation() {
        let sel = select_method(&GoalPolicy::new(Goal::Validation), &pi0_of(Some(0.9)), false);
        assert_eq!(sel.method, AdjustMethod::Holm);
    }

    #[test]
    fn test_bh_default() {
        let sel = select_method(&GoalPolicy::new(Goal::Balanced), &pi0_of(Some(0.9)), false);
        assert_eq!(sel.method, AdjustMethod::Bh);
    }

    #[test]
    fn test_undefined_pi0_never_selects_storey() {
        let sel = select_method(&GoalPolicy::new(Goal::Discovery), &pi0_of(None), false);
        assert_ne!(sel.method, AdjustMethod::Storey);
    }

    #[test]
    fn test_resolve_storey_substitution() {
        let (method, note) = resolve_storey(AdjustMethod::Storey, &pi0_of(None));
        assert_eq!(method, AdjustMethod::Bh);
        assert!(note.is_some());

        let (method, note) = resolve_storey(AdjustMethod::Storey, &pi0_of(Some(0.7)));
        assert_eq!(method, AdjustMethod::Storey);
        assert!(note.is_none());
    }
}
