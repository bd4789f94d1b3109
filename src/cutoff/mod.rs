//! Effect-size (logFC) cutoff estimation.
//!
//! Four independent estimators derive a |logFC| significance cutoff from
//! the observed data, plus an auto mode that runs all four and takes a
//! consensus. Each estimator returns the cutoff together with a reasoning
//! string naming the method and the key statistic that drove the value.

mod consensus;
mod mad;
mod mixture;
mod percentile;
mod power;

pub use consensus::{estimate_cutoff, estimate_cutoff_auto, EstimatorOutcome};
pub use mad::estimate_cutoff_mad;
pub use mixture::{estimate_cutoff_mixture, MixtureConfig};
pub use percentile::estimate_cutoff_percentile;
pub use power::estimate_cutoff_power;

use crate::data::FeatureRecord;
use crate::error::{AtoError, Result};
use crate::goal::{GoalPolicy, TieBias};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum null-set size required by the mad and percentile estimators.
pub const MIN_NULL_SET: usize = 20;

/// Scale factor turning a MAD into a normal-consistent standard deviation.
pub const MAD_TO_SD: f64 = 1.4826;

/// A cutoff estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CutoffMethod {
    /// Robust spread of the null set, scaled by the stringency multiplier.
    Mad,
    /// Two-component Gaussian mixture posterior crossing.
    Mixture,
    /// Minimum detectable effect from a power calculation.
    Power,
    /// 95th percentile of |logFC| within the null set.
    Percentile,
    /// Median consensus over all successful estimators.
    Auto,
}

impl CutoffMethod {
    /// The four concrete estimators, in consensus order.
    pub const ESTIMATORS: [CutoffMethod; 4] = [
        CutoffMethod::Mad,
        CutoffMethod::Mixture,
        CutoffMethod::Power,
        CutoffMethod::Percentile,
    ];

    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mad => "mad",
            Self::Mixture => "mixture",
            Self::Power => "power",
            Self::Percentile => "percentile",
            Self::Auto => "auto",
        }
    }
}

impl FromStr for CutoffMethod {
    type Err = AtoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mad" => Ok(Self::Mad),
            "mixture" | "gmm" => Ok(Self::Mixture),
            "power" => Ok(Self::Power),
            "percentile" => Ok(Self::Percentile),
            "auto" | "consensus" => Ok(Self::Auto),
            other => Err(AtoError::Numerical(format!(
                "unknown cutoff method '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for CutoffMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An estimated |logFC| cutoff with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoffEstimate {
    /// The cutoff magnitude (non-negative).
    pub value: f64,
    /// The method that actually produced the value.
    pub method: CutoffMethod,
    /// The statistic(s) behind the value, plus any fallback taken.
    pub reasoning: String,
}

/// Stringency parameters the estimators consume, derived from the goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoffParams {
    /// Multiplier applied to the MAD-based standard deviation.
    pub k: f64,
    /// Two-sided significance level for the power estimator.
    pub alpha: f64,
    /// Target power (1 − β) for the power estimator.
    pub power_target: f64,
    /// Posterior probability target for the mixture estimator.
    pub posterior_target: f64,
    /// Tie-break bias for the consensus median.
    pub tie_bias: TieBias,
    /// Group sizes for the power estimator, when known.
    pub n1: Option<usize>,
    pub n2: Option<usize>,
}

impl CutoffParams {
    /// Derive estimator parameters from a goal policy and optional group sizes.
    pub fn from_policy(policy: &GoalPolicy, n1: Option<usize>, n2: Option<usize>) -> Self {
        Self {
            k: policy.mad_k,
            alpha: policy.power_alpha,
            power_target: policy.power_target,
            posterior_target: policy.mixture_posterior,
            tie_bias: policy.tie_bias,
            n1,
            n2,
        }
    }
}

impl Default for CutoffParams {
    fn default() -> Self {
        Self::from_policy(&GoalPolicy::default(), None, None)
    }
}

/// The calibration null set: logFC values of features with no evidence of
/// differential expression.
#[derive(Debug, Clone)]
pub struct NullSet {
    /// logFC values of the null-set members.
    pub log_fc: Vec<f64>,
    /// Which column defined membership ("padj > 0.5" or "pvalue > 0.5").
    pub criterion: &'static str,
}

/// Extract the null set from a record slice.
///
/// Membership is padj > 0.5 when any record carries an adjusted p-value,
/// otherwise raw pvalue > 0.5. Only evaluable records participate.
pub fn null_set(records: &[FeatureRecord]) -> NullSet {
    let has_padj = records.iter().any(|r| r.p_adj.is_some());
    let (log_fc, criterion) = if has_padj {
        (
            records
                .iter()
                .filter(|r| r.is_evaluable())
                .filter(|r| r.p_adj.map(|q| q > 0.5).unwrap_or(false))
                .map(|r| r.log_fc)
                .collect(),
            "padj > 0.5",
        )
    } else {
        (
            records
                .iter()
                .filter(|r| r.is_evaluable())
                .filter(|r| r.p_value.map(|p| p > 0.5).unwrap_or(false))
                .map(|r| r.log_fc)
                .collect(),
            "pvalue > 0.5",
        )
    };
    NullSet { log_fc, criterion }
}

/// Median of a slice (empty slice returns NaN).
pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Median absolute deviation about the median.
pub(crate) fn mad(values: &[f64]) -> f64 {
    let center = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Linear-interpolation quantile (R type 7) of a slice, q in [0, 1].
pub(crate) fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}
