//! Analysis goal policies.
//!
//! A goal encodes how aggressive the threshold optimization should be.
//! Discovery trades specificity for sensitivity (screening experiments),
//! validation does the opposite (confirmation experiments), and balanced
//! sits between the two. The policy is an immutable value object built once
//! at call entry; every stringency parameter the engines consume flows
//! through it.

use crate::error::{AtoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Analysis goal selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    /// Maximize sensitivity; accept a higher false discovery rate.
    Discovery,
    /// Default trade-off between sensitivity and specificity.
    Balanced,
    /// Minimize false positives; family-wise control emphasis.
    Validation,
}

impl Goal {
    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Balanced => "balanced",
            Self::Validation => "validation",
        }
    }
}

impl FromStr for Goal {
    type Err = AtoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discovery" => Ok(Self::Discovery),
            "balanced" => Ok(Self::Balanced),
            "validation" => Ok(Self::Validation),
            other => Err(AtoError::InvalidGoal(other.to_string())),
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the auto/consensus cutoff breaks ties when the number of successful
/// estimators is even.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBias {
    /// Take the lower of the two middle values (more genes pass).
    Permissive,
    /// Take the mean of the two middle values.
    Median,
    /// Take the upper of the two middle values (fewer genes pass).
    Conservative,
}

/// Stringency parameters derived from a [`Goal`].
///
/// Constructed once per optimization call and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalPolicy {
    /// The goal this policy was derived from.
    pub goal: Goal,
    /// Adjusted p-value cutoff (FDR or FWER target).
    pub fdr_target: f64,
    /// Stringency multiplier for the MAD cutoff estimator.
    pub mad_k: f64,
    /// Two-sided significance level for the power cutoff estimator.
    pub power_alpha: f64,
    /// Target statistical power for the power cutoff estimator.
    pub power_target: f64,
    /// Posterior probability the mixture estimator requires before calling
    /// a logFC magnitude differentially expressed.
    pub mixture_posterior: f64,
    /// Tie-break bias for the consensus cutoff.
    pub tie_bias: TieBias,
}

impl GoalPolicy {
    /// Build the policy for a goal.
    pub fn new(goal: Goal) -> Self {
        match goal {
            Goal::Discovery => Self {
                goal,
                fdr_target: 0.10,
                mad_k: 2.0,
                power_alpha: 0.10,
                power_target: 0.80,
                mixture_posterior: 0.90,
                tie_bias: TieBias::Permissive,
            },
            Goal::Balanced => Self {
                goal,
                fdr_target: 0.05,
                mad_k: 2.5,
                power_alpha: 0.05,
                power_target: 0.80,
                mixture_posterior: 0.95,
                tie_bias: TieBias::Median,
            },
            Goal::Validation => Self {
                goal,
                fdr_target: 0.01,
                mad_k: 3.0,
                power_alpha: 0.01,
                power_target: 0.90,
                mixture_posterior: 0.99,
                tie_bias: TieBias::Conservative,
            },
        }
    }
}

impl Default for GoalPolicy {
    fn default() -> Self {
        Self::new(Goal::Balanced)
    }
}
