//! Percentile-based cutoff: upper tail of the null |logFC| distribution.

use crate::cutoff::{null_set, quantile, CutoffEstimate, CutoffMethod, CutoffParams, MIN_NULL_SET};
use crate::data::FeatureRecord;
use crate::error::{AtoError, Result};

/// Percentile of the null |logFC| distribution used as the cutoff.
const NULL_PERCENTILE: f64 = 0.95;

/// Estimate the logFC cutoff as the 95th percentile of |logFC| within the
/// null set.
///
/// Uses the same null-set definition and minimum-size requirement as the
/// MAD estimator. Independent of the stringency multiplier: the percentile
/// itself fixes the specificity.
pub fn estimate_cutoff_percentile(
    records: &[FeatureRecord],
    _params: &CutoffParams,
) -> Result<CutoffEstimate> {
    let ns = null_set(records);
    if ns.log_fc.len() < MIN_NULL_SET {
        return Err(AtoError::InsufficientNullSet {
            required: MIN_NULL_SET,
            available: ns.log_fc.len(),
        });
    }

    let abs_log_fc: Vec<f64> = ns.log_fc.iter().map(|v| v.abs()).collect();
    let cutoff = quantile(&abs_log_fc, NULL_PERCENTILE);

    Ok(CutoffEstimate {
        value: cutoff,
        method: CutoffMethod::Percentile,
        reasoning: format!(
            "percentile: cutoff = {:.4} as the 95th percentile of |logFC| in \
             the null set ({}, n = {})",
            cutoff,
            ns.criterion,
            ns.log_fc.len()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percentile_cutoff() {
        // |logFC| evenly spread over (0, 1]: the 95th percentile of 100
        // points 0.01..=1.00 interpolates to 0.9505.
        let records: Vec<FeatureRecord> = (0..100)
            .map(|i| FeatureRecord::new(format!("g{}", i), (i + 1) as f64 * 0.01, Some(0.9)))
            .collect();

        let est = estimate_cutoff_percentile(&records, &CutoffParams::default()).unwrap();
        assert_relative_eq!(est.value, 0.9505, epsilon = 1e-10);
        assert!(est.reasoning.contains("95th percentile"));
    }

    #[test]
    fn test_sign_ignored() {
        let records: Vec<FeatureRecord> = (0..60)
            .map(|i| {
                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                FeatureRecord::new(format!("g{}", i), sign * 0.3, Some(0.8))
            })
            .collect();
        let est = estimate_cutoff_percentile(&records, &CutoffParams::default()).unwrap();
        assert_relative_eq!(est.value, 0.3, epsilon = 1e-10);
    }

    #[test]
    fn test_insufficient_null_set() {
        let records: Vec<FeatureRecord> = (0..10)
            .map(|i| FeatureRecord::new(format!("g{}", i), 0.1, Some(0.9)))
            .collect();
        let err = estimate_cutoff_percentile(&records, &CutoffParams::default()).unwrap_err();
        assert!(matches!(err, AtoError::InsufficientNullSet { .. }));
    }
}
