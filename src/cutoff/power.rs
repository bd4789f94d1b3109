//! Power-based cutoff: minimum detectable effect at the goal's α and power.

use crate::cutoff::{mad, null_set, CutoffEstimate, CutoffMethod, CutoffParams, MAD_TO_SD};
use crate::data::FeatureRecord;
use crate::error::{AtoError, Result};
use statrs::distribution::{ContinuousCDF, Normal};

/// Estimate the logFC cutoff as the minimum detectable effect
/// (z_α + z_β) · SE.
///
/// The standard error comes from the table's lfcSE column (median over
/// evaluable records) when present. Without it, the robust spread of the
/// null-set logFC serves as an SE estimate, but only when the caller
/// supplies group sizes confirming a two-group design; otherwise the
/// estimator fails with a standard-error-unavailable error.
pub fn estimate_cutoff_power(
    records: &[FeatureRecord],
    params: &CutoffParams,
) -> Result<CutoffEstimate> {
    let (se, se_source) = estimate_se(records, params)?;

    let normal = Normal::new(0.0, 1.0).unwrap();
    let z_alpha = normal.inverse_cdf(1.0 - params.alpha / 2.0);
    let z_beta = normal.inverse_cdf(params.power_target);
    let cutoff = (z_alpha + z_beta) * se;

    Ok(CutoffEstimate {
        value: cutoff,
        method: CutoffMethod::Power,
        reasoning: format!(
            "power: cutoff = {:.4} as minimum detectable effect with SE = {:.4} \
             ({}), z_alpha = {:.3} (two-sided alpha = {}), z_beta = {:.3} \
             (power = {})",
            cutoff, se, se_source, z_alpha, params.alpha, z_beta, params.power_target
        ),
    })
}

fn estimate_se(records: &[FeatureRecord], params: &CutoffParams) -> Result<(f64, String)> {
    let lfc_ses: Vec<f64> = records
        .iter()
        .filter(|r| r.is_evaluable())
        .filter_map(|r| r.lfc_se)
        .filter(|se| se.is_finite() && *se > 0.0)
        .collect();
    if !lfc_ses.is_empty() {
        let se = crate::cutoff::median(&lfc_ses);
        return Ok((se, format!("median lfcSE over {} features", lfc_ses.len())));
    }

    match (params.n1, params.n2) {
        (Some(n1), Some(n2)) if n1 > 0 && n2 > 0 => {
            let ns = null_set(records);
            if ns.log_fc.len() < 2 {
                return Err(AtoError::StandardErrorUnavailable(
                    "no lfcSE column and null set too small to estimate the logFC spread"
                        .to_string(),
                ));
            }
            let se = mad(&ns.log_fc) * MAD_TO_SD;
            if !(se.is_finite() && se > 0.0) {
                return Err(AtoError::StandardErrorUnavailable(
                    "null-set logFC spread is zero or undefined".to_string(),
                ));
            }
            Ok((
                se,
                format!(
                    "robust null-set logFC spread (n = {}), groups {} vs {}",
                    ns.log_fc.len(),
                    n1,
                    n2
                ),
            ))
        }
        _ => Err(AtoError::StandardErrorUnavailable(
            "no lfcSE column and no group sizes supplied".to_string(),
        )),
    }
}
