//! MAD-based cutoff: robust spread of the null logFC distribution.

use crate::cutoff::{mad, null_set, CutoffEstimate, CutoffMethod, CutoffParams, MAD_TO_SD, MIN_NULL_SET};
use crate::data::FeatureRecord;
use crate::error::{AtoError, Result};

/// Estimate the logFC cutoff from the median absolute deviation of the
/// null set.
///
/// The null-set logFC values approximate draws from the no-effect
/// distribution; their MAD scaled by 1.4826 estimates its standard
/// deviation, and the cutoff is that deviation times the goal's stringency
/// multiplier k. Fails with an insufficient-null-set error when fewer than
/// [`MIN_NULL_SET`] features qualify.
pub fn estimate_cutoff_mad(records: &[FeatureRecord], params: &CutoffParams) -> Result<CutoffEstimate> {
    let ns = null_set(records);
    if ns.log_fc.len() < MIN_NULL_SET {
        return Err(AtoError::InsufficientNullSet {
            required: MIN_NULL_SET,
            available: ns.log_fc.len(),
        });
    }

    let mad_value = mad(&ns.log_fc);
    let sigma = mad_value * MAD_TO_SD;
    let cutoff = sigma * params.k;

    Ok(CutoffEstimate {
        value: cutoff,
        method: CutoffMethod::Mad,
        reasoning: format!(
            "mad: cutoff = {:.4} from null-set ({}, n = {}) MAD = {:.4}, \
             sigma = {:.4}, k = {:.1}",
            cutoff,
            ns.criterion,
            ns.log_fc.len(),
            mad_value,
            sigma,
            params.k
        ),
    })
}
