//! Multiple-testing correction procedures.
//!
//! Six procedures over a raw p-value vector, all returning adjusted
//! p-values clipped to [0, 1] in the input order. FDR-controlling
//! procedures (BH, BY, Storey) are monotonized in rank space exactly as the
//! R `p.adjust` conventions do; FWER procedures (Holm, Hochberg,
//! Bonferroni) use their step-down/step-up forms.

use crate::error::{AtoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A multiple-testing correction procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustMethod {
    /// Benjamini-Hochberg FDR control under independence/PRDS.
    Bh,
    /// Benjamini-Yekutieli FDR control under arbitrary dependence.
    By,
    /// Holm step-down FWER control.
    Holm,
    /// Hochberg step-up FWER control.
    Hochberg,
    /// Bonferroni single-step FWER control.
    Bonferroni,
    /// Storey q-values: BH rescaled by the estimated null proportion.
    Storey,
}

impl AdjustMethod {
    /// All six procedures, in power order (most conservative first).
    pub const ALL: [AdjustMethod; 6] = [
        AdjustMethod::Bonferroni,
        AdjustMethod::Holm,
        AdjustMethod::Hochberg,
        AdjustMethod::By,
        AdjustMethod::Bh,
        AdjustMethod::Storey,
    ];

    /// Get the conventional name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bh => "BH",
            Self::By => "BY",
            Self::Holm => "Holm",
            Self::Hochberg => "Hochberg",
            Self::Bonferroni => "Bonferroni",
            Self::Storey => "Storey",
        }
    }

    /// Whether the procedure controls FDR (as opposed to FWER).
    pub fn controls_fdr(&self) -> bool {
        matches!(self, Self::Bh | Self::By | Self::Storey)
    }
}

impl FromStr for AdjustMethod {
    type Err = AtoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bh" | "fdr" | "benjamini-hochberg" => Ok(Self::Bh),
            "by" | "benjamini-yekutieli" => Ok(Self::By),
            "holm" => Ok(Self::Holm),
            "hochberg" => Ok(Self::Hochberg),
            "bonferroni" => Ok(Self::Bonferroni),
            "storey" | "qvalue" | "q-value" => Ok(Self::Storey),
            other => Err(AtoError::Numerical(format!(
                "unknown adjustment method '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AdjustMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Apply a correction procedure; Storey uses π0 = 1 (equivalent to BH).
pub fn adjust_pvalues(p_values: &[f64], method: AdjustMethod) -> Vec<f64> {
    adjust_pvalues_with_pi0(p_values, method, 1.0)
}

/// Apply a correction procedure with an explicit π0 (used by Storey only).
pub fn adjust_pvalues_with_pi0(p_values: &[f64], method: AdjustMethod, pi0: f64) -> Vec<f64> {
    let n = p_values.len();
    if n == 0 {
        return vec![];
    }
    match method {
        AdjustMethod::Bonferroni => p_values
            .iter()
            .map(|&p| (p * n as f64).min(1.0))
            .collect(),
        AdjustMethod::Bh => step_up_fdr(p_values, 1.0),
        AdjustMethod::By => step_up_fdr(p_values, harmonic_sum(n)),
        AdjustMethod::Storey => step_up_fdr(p_values, pi0.clamp(0.0, 1.0)),
        AdjustMethod::Holm => holm(p_values),
        AdjustMethod::Hochberg => hochberg(p_values),
    }
}

/// Harmonic-sum penalty c(n) = Σ 1/i used by Benjamini-Yekutieli.
pub fn harmonic_sum(n: usize) -> f64 {
    (1..=n).map(|i| 1.0 / i as f64).sum()
}

/// Indices that sort `p_values` ascending.
fn sorted_indices(p_values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..p_values.len()).collect();
    indices.sort_by(|&a, &b| {
        p_values[a]
            .partial_cmp(&p_values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices
}

/// Shared BH-family kernel: q[rank] = factor · p · n / rank, monotonized by
/// a backwards minimum scan and clipped to [0, 1].
fn step_up_fdr(p_values: &[f64], factor: f64) -> Vec<f64> {
    let n = p_values.len();
    let n_f64 = n as f64;
    let indices = sorted_indices(p_values);

    let mut q_sorted = vec![0.0; n];
    q_sorted[n - 1] = (p_values[indices[n - 1]] * factor).min(1.0);
    for i in (0..n - 1).rev() {
        let rank = (i + 1) as f64;
        let adjusted = p_values[indices[i]] * factor * n_f64 / rank;
        q_sorted[i] = adjusted.min(q_sorted[i + 1]).min(1.0);
    }

    let mut q_values = vec![0.0; n];
    for (i, &orig_idx) in indices.iter().enumerate() {
        q_values[orig_idx] = q_sorted[i];
    }
    q_values
}

/// Holm step-down: running maximum of p·(n − rank + 1) over ascending ranks.
fn holm(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    let indices = sorted_indices(p_values);

    let mut adj_sorted = vec![0.0; n];
    let mut running_max = 0.0_f64;
    for (i, &orig_idx) in indices.iter().enumerate() {
        let scaled = p_values[orig_idx] * (n - i) as f64;
        running_max = running_max.max(scaled);
        adj_sorted[i] = running_max.min(1.0);
    }

    let mut adjusted = vec![0.0; n];
    for (i, &orig_idx) in indices.iter().enumerate() {
        adjusted[orig_idx] = adj_sorted[i];
    }
    adjusted
}

/// Hochberg step-up: running minimum of p·(n − rank + 1) scanning from the
/// largest p-value downward.
fn hochberg(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    let indices = sorted_indices(p_values);

    let mut adj_sorted = vec![0.0; n];
    adj_sorted[n - 1] = p_values[indices[n - 1]].min(1.0);
    for i in (0..n - 1).rev() {
        let scaled = p_values[indices[i]] * (n - i) as f64;
        adj_sorted[i] = scaled.min(adj_sorted[i + 1]).min(1.0);
    }

    let mut adjusted = vec![0.0; n];
    for (i, &orig_idx) in indices.iter().enumerate() {
        adjusted[orig_idx] = adj_sorted[i];
    }
    adjusted
}
