//! Null-proportion (π0) estimation from the p-value distribution.
//!
//! π0 is the fraction of features that are truly null. Under the null,
//! p-values are uniform, so the tail proportion #{p > λ} / (n·(1−λ)) is an
//! unbiased π0 estimate for any λ once the signal (concentrated near 0) no
//! longer contaminates the tail. Following Storey & Tibshirani (2003), we
//! evaluate that proportion across a λ sweep and smooth the curve, taking
//! the extrapolated value at λ → 1.

use crate::error::Result;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Minimum usable p-values before the smoother is attempted.
pub const MIN_PVALUES_FOR_SMOOTHER: usize = 100;

/// λ sweep boundaries: 0.05 to 0.95 in steps of 0.05.
const LAMBDA_START: f64 = 0.05;
const LAMBDA_STEP: f64 = 0.05;
const N_LAMBDA: usize = 19;

/// How the π0 estimate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pi0Method {
    /// Cubic smoother over the λ sweep, evaluated at λ = 1.
    Smoother,
    /// Naive fallback: min(1, 2·mean(p)).
    Naive,
    /// No usable p-values; downstream logic must use its documented default.
    Undefined,
}

impl Pi0Method {
    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Smoother => "smoother",
            Self::Naive => "naive",
            Self::Undefined => "undefined",
        }
    }
}

/// Result of π0 estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pi0Estimate {
    /// Estimated null proportion in [0, 1], or `None` when undefined.
    pub value: Option<f64>,
    /// Estimation path actually taken.
    pub method: Pi0Method,
    /// Number of usable p-values.
    pub n_used: usize,
    /// Human-readable account of the estimation, including any fallback.
    pub reasoning: String,
}

impl Pi0Estimate {
    /// The estimate, or a supplied default when undefined.
    pub fn value_or(&self, default: f64) -> f64 {
        self.value.unwrap_or(default)
    }
}

/// Estimate the proportion of truly null features from raw p-values.
///
/// Non-finite and out-of-range values are excluded. With fewer than
/// [`MIN_PVALUES_FOR_SMOOTHER`] usable p-values, or when the smoother fit
/// degenerates, the naive estimate min(1, 2·mean(p)) is used instead. With
/// zero usable p-values the estimate is undefined; callers fall back to
/// their documented defaults rather than failing.
pub fn estimate_pi0(p_values: &[f64]) -> Pi0Estimate {
    let usable: Vec<f64> = p_values
        .iter()
        .copied()
        .filter(|p| p.is_finite() && (0.0..=1.0).contains(p))
        .collect();
    let n = usable.len();

    if n == 0 {
        return Pi0Estimate {
            value: None,
            method: Pi0Method::Undefined,
            n_used: 0,
            reasoning: "pi0 undefined: no usable p-values".to_string(),
        };
    }

    let mean_p = usable.iter().sum::<f64>() / n as f64;
    let naive = (2.0 * mean_p).min(1.0);

    if n < MIN_PVALUES_FOR_SMOOTHER {
        return Pi0Estimate {
            value: Some(naive),
            method: Pi0Method::Naive,
            n_used: n,
            reasoning: format!(
                "pi0 = {:.3} via naive estimator (only {} usable p-values, \
                 smoother requires {})",
                naive, n, MIN_PVALUES_FOR_SMOOTHER
            ),
        };
    }

    // Degenerate p-value vector: the λ sweep carries no information.
    let var_p = usable.iter().map(|p| (p - mean_p).powi(2)).sum::<f64>() / n as f64;
    if var_p < 1e-12 {
        return Pi0Estimate {
            value: Some(naive),
            method: Pi0Method::Naive,
            n_used: n,
            reasoning: format!(
                "pi0 = {:.3} via naive estimator (degenerate p-value distribution)",
                naive
            ),
        };
    }

    match smoother_pi0(&usable) {
        Ok(value) => Pi0Estimate {
            value: Some(value),
            method: Pi0Method::Smoother,
            n_used: n,
            reasoning: format!(
                "pi0 = {:.3} via cubic smoother over lambda sweep ({} p-values)",
                value, n
            ),
        },
        Err(e) => Pi0Estimate {
            value: Some(naive),
            method: Pi0Method::Naive,
            n_used: n,
            reasoning: format!(
                "pi0 = {:.3} via naive estimator (smoother failed: {})",
                naive, e
            ),
        },
    }
}

/// Fit π0(λ) with a cubic polynomial and extrapolate to λ = 1.
fn smoother_pi0(p_values: &[f64]) -> Result<f64> {
    use crate::error::AtoError;

    let n = p_values.len() as f64;
    let lambdas: Vec<f64> = (0..N_LAMBDA)
        .map(|i| LAMBDA_START + LAMBDA_STEP * i as f64)
        .collect();
    let pi0_at: Vec<f64> = lambdas
        .iter()
        .map(|&lam| {
            let tail = p_values.iter().filter(|&&p| p > lam).count() as f64;
            tail / (n * (1.0 - lam))
        })
        .collect();

    // Least-squares cubic in λ, solved by SVD.
    let design = DMatrix::from_fn(N_LAMBDA, 4, |i, j| lambdas[i].powi(j as i32));
    let response = DVector::from_vec(pi0_at);
    let svd = design.svd(true, true);
    let coef = svd
        .solve(&response, 1e-12)
        .map_err(|e| AtoError::Numerical(format!("smoother solve failed: {}", e)))?;

    // Polynomial value at λ = 1 is the coefficient sum.
    let fitted = coef.iter().sum::<f64>();
    if !fitted.is_finite() {
        return Err(AtoError::Numerical("smoother produced non-finite pi0".into()));
    }
    Ok(fitted.clamp(0.0, 1.0))
}
