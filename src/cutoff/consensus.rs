//! Auto/consensus cutoff: run every estimator, combine the successes.
//!
//! Estimator failures are expected here (small null sets, non-separating
//! mixtures, missing standard errors) and are recovered by exclusion, but
//! never silently: every skipped estimator and its cause lands in the
//! reasoning text of the consensus estimate.

use crate::cutoff::{
    estimate_cutoff_mad, estimate_cutoff_mixture, estimate_cutoff_percentile,
    estimate_cutoff_power, CutoffEstimate, CutoffMethod, CutoffParams,
};
use crate::data::FeatureRecord;
use crate::error::{AtoError, Result};
use crate::goal::TieBias;
use serde::{Deserialize, Serialize};

/// Outcome of one estimator within the consensus run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorOutcome {
    /// Which estimator ran.
    pub method: CutoffMethod,
    /// Its cutoff, or `None` when it failed.
    pub value: Option<f64>,
    /// Its reasoning on success, or the failure cause.
    pub note: String,
}

/// Estimate a cutoff with the requested method.
///
/// `Auto` dispatches to the consensus combiner; explicit methods propagate
/// their own failures to the caller untouched.
pub fn estimate_cutoff(
    records: &[FeatureRecord],
    method: CutoffMethod,
    params: &CutoffParams,
) -> Result<CutoffEstimate> {
    match method {
        CutoffMethod::Mad => estimate_cutoff_mad(records, params),
        CutoffMethod::Mixture => estimate_cutoff_mixture(records, params),
        CutoffMethod::Power => estimate_cutoff_power(records, params),
        CutoffMethod::Percentile => estimate_cutoff_percentile(records, params),
        CutoffMethod::Auto => estimate_cutoff_auto(records, params),
    }
}

/// Run all four estimators, reporting each outcome.
pub fn run_estimators(records: &[FeatureRecord], params: &CutoffParams) -> Vec<EstimatorOutcome> {
    CutoffMethod::ESTIMATORS
        .iter()
        .map(|&method| match estimate_cutoff(records, method, params) {
            Ok(est) => EstimatorOutcome {
                method,
                value: Some(est.value),
                note: est.reasoning,
            },
            Err(e) => EstimatorOutcome {
                method,
                value: None,
                note: format!("skipped ({})", e),
            },
        })
        .collect()
}

/// Consensus cutoff: the median of all successful estimators.
///
/// Fails with a no-cutoff-available error only when every estimator fails.
pub fn estimate_cutoff_auto(
    records: &[FeatureRecord],
    params: &CutoffParams,
) -> Result<CutoffEstimate> {
    let outcomes = run_estimators(records, params);
    let mut successes: Vec<f64> = outcomes.iter().filter_map(|o| o.value).collect();

    if successes.is_empty() {
        let causes: Vec<String> = outcomes
            .iter()
            .map(|o| format!("{}: {}", o.method.name(), o.note))
            .collect();
        return Err(AtoError::NoCutoffAvailable(causes.join("; ")));
    }

    successes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let value = tie_breaking_median(&successes, params.tie_bias);

    let mut parts = Vec::with_capacity(outcomes.len() + 1);
    for o in &outcomes {
        match o.value {
            Some(v) => parts.push(format!("{} = {:.4}", o.method.name(), v)),
            None => parts.push(format!("{} {}", o.method.name(), o.note)),
        }
    }
    let reasoning = format!(
        "auto: consensus cutoff = {:.4} as the median of {} successful \
         estimator(s) [{}]",
        value,
        successes.len(),
        parts.join("; ")
    );

    Ok(CutoffEstimate {
        value,
        method: CutoffMethod::Auto,
        reasoning,
    })
}

/// Median of a sorted slice with the goal's tie bias for even counts.
fn tie_breaking_median(sorted: &[f64], bias: TieBias) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        return sorted[n / 2];
    }
    let lower = sorted[n / 2 - 1];
    let upper = sorted[n / 2];
    match bias {
        TieBias::Permissive => lower,
        TieBias::Median => (lower + upper) / 2.0,
        TieBias::Conservative => upper,
    }
}
