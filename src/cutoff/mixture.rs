//! Mixture-based cutoff: two-component Gaussian fit to |logFC|.
//!
//! The |logFC| distribution is modeled as a mixture of a null component
//! pinned at zero and a free DE component. The EM fit is fully
//! deterministic: initialization splits the data at the median |logFC|
//! rather than sampling, so identical inputs always produce identical
//! cutoffs. The cutoff is the smallest magnitude at which the posterior
//! probability of the DE component crosses the goal's target, scanning
//! outward from zero.

use crate::cutoff::{CutoffEstimate, CutoffMethod, CutoffParams};
use crate::data::FeatureRecord;
use crate::error::{AtoError, Result};

/// Variance floor preventing component collapse.
const SIGMA_FLOOR: f64 = 1e-3;

/// Configuration for the mixture fit.
#[derive(Debug, Clone)]
pub struct MixtureConfig {
    /// Maximum EM iterations before giving up.
    pub max_iter: usize,
    /// Convergence tolerance on the log-likelihood.
    pub tol: f64,
    /// Minimum number of evaluable features for a meaningful fit.
    pub min_features: usize,
    /// Resolution of the outward posterior scan.
    pub scan_steps: usize,
}

impl Default for MixtureConfig {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tol: 1e-6,
            min_features: 25,
            scan_steps: 1000,
        }
    }
}

/// Fitted mixture parameters.
#[derive(Debug, Clone)]
struct MixtureFit {
    /// Null component standard deviation (mean pinned at 0).
    sigma0: f64,
    /// DE component mean.
    mu1: f64,
    /// DE component standard deviation.
    sigma1: f64,
    /// DE component weight.
    w1: f64,
    /// EM iterations used.
    iterations: usize,
}

/// Estimate the logFC cutoff from a two-component Gaussian mixture.
pub fn estimate_cutoff_mixture(
    records: &[FeatureRecord],
    params: &CutoffParams,
) -> Result<CutoffEstimate> {
    estimate_cutoff_mixture_with_config(records, params, &MixtureConfig::default())
}

/// Mixture cutoff with explicit fit configuration.
pub fn estimate_cutoff_mixture_with_config(
    records: &[FeatureRecord],
    params: &CutoffParams,
    config: &MixtureConfig,
) -> Result<CutoffEstimate> {
    let abs_log_fc: Vec<f64> = records
        .iter()
        .filter(|r| r.is_evaluable())
        .map(|r| r.log_fc.abs())
        .collect();

    if abs_log_fc.len() < config.min_features {
        return Err(AtoError::MixtureConvergence(format!(
            "only {} evaluable features, mixture fit requires {}",
            abs_log_fc.len(),
            config.min_features
        )));
    }
    let max_x = abs_log_fc.iter().cloned().fold(0.0_f64, f64::max);
    if max_x <= 0.0 {
        return Err(AtoError::MixtureConvergence(
            "all logFC values are zero".to_string(),
        ));
    }

    let fit = fit_em(&abs_log_fc, config)?;
    let cutoff = scan_posterior(&fit, max_x, params.posterior_target, config.scan_steps)?;

    Ok(CutoffEstimate {
        value: cutoff,
        method: CutoffMethod::Mixture,
        reasoning: format!(
            "mixture: cutoff = {:.4} where DE-component posterior first exceeds \
             {:.2} (null sigma = {:.4}, DE mean = {:.4}, DE sigma = {:.4}, \
             DE weight = {:.3}, {} EM iterations)",
            cutoff, params.posterior_target, fit.sigma0, fit.mu1, fit.sigma1, fit.w1, fit.iterations
        ),
    })
}

fn gaussian_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    (-0.5 * z * z).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt())
}

/// Deterministic EM fit with the null mean pinned at zero.
fn fit_em(data: &[f64], config: &MixtureConfig) -> Result<MixtureFit> {
    let n = data.len();

    // Data-derived initialization: split at the median magnitude.
    let split = crate::cutoff::median(data);
    let lower: Vec<f64> = data.iter().cloned().filter(|&x| x <= split).collect();
    let upper: Vec<f64> = data.iter().cloned().filter(|&x| x > split).collect();
    if upper.is_empty() || lower.is_empty() {
        return Err(AtoError::MixtureConvergence(
            "degenerate logFC distribution, median split produced an empty component"
                .to_string(),
        ));
    }

    let mut sigma0 = (lower.iter().map(|x| x * x).sum::<f64>() / lower.len() as f64)
        .sqrt()
        .max(SIGMA_FLOOR);
    let mut mu1 = upper.iter().sum::<f64>() / upper.len() as f64;
    let mut sigma1 = (upper.iter().map(|x| (x - mu1).powi(2)).sum::<f64>()
        / upper.len() as f64)
        .sqrt()
        .max(SIGMA_FLOOR);
    let mut w1 = upper.len() as f64 / n as f64;

    let mut responsibilities = vec![0.0; n];
    let mut prev_ll = f64::NEG_INFINITY;

    for iteration in 1..=config.max_iter {
        // E-step.
        let mut ll = 0.0;
        for (i, &x) in data.iter().enumerate() {
            let d0 = (1.0 - w1) * gaussian_pdf(x, 0.0, sigma0);
            let d1 = w1 * gaussian_pdf(x, mu1, sigma1);
            let total = d0 + d1;
            if total <= 0.0 || !total.is_finite() {
                return Err(AtoError::MixtureConvergence(
                    "vanishing mixture density during E-step".to_string(),
                ));
            }
            responsibilities[i] = d1 / total;
            ll += total.ln();
        }

        // M-step.
        let r1_sum: f64 = responsibilities.iter().sum();
        let r0_sum = n as f64 - r1_sum;
        if r1_sum < 1e-8 || r0_sum < 1e-8 {
            return Err(AtoError::MixtureConvergence(
                "one mixture component collapsed to zero weight".to_string(),
            ));
        }
        w1 = (r1_sum / n as f64).clamp(1e-4, 1.0 - 1e-4);
        mu1 = data
            .iter()
            .zip(&responsibilities)
            .map(|(&x, &r)| r * x)
            .sum::<f64>()
            / r1_sum;
        mu1 = mu1.max(0.0);
        sigma1 = (data
            .iter()
            .zip(&responsibilities)
            .map(|(&x, &r)| r * (x - mu1).powi(2))
            .sum::<f64>()
            / r1_sum)
            .sqrt()
            .max(SIGMA_FLOOR);
        sigma0 = (data
            .iter()
            .zip(&responsibilities)
            .map(|(&x, &r)| (1.0 - r) * x * x)
            .sum::<f64>()
            / r0_sum)
            .sqrt()
            .max(SIGMA_FLOOR);

        if (ll - prev_ll).abs() < config.tol {
            return Ok(MixtureFit {
                sigma0,
                mu1,
                sigma1,
                w1,
                iterations: iteration,
            });
        }
        prev_ll = ll;
    }

    Err(AtoError::MixtureConvergence(format!(
        "log-likelihood did not stabilize within {} iterations (tol = {:e})",
        config.max_iter, config.tol
    )))
}

/// Outward scan from zero for the first posterior crossing.
fn scan_posterior(fit: &MixtureFit, max_x: f64, target: f64, steps: usize) -> Result<f64> {
    let posterior = |m: f64| -> f64 {
        let d0 = (1.0 - fit.w1) * gaussian_pdf(m, 0.0, fit.sigma0);
        let d1 = fit.w1 * gaussian_pdf(m, fit.mu1, fit.sigma1);
        d1 / (d0 + d1)
    };

    if posterior(0.0) >= target {
        return Err(AtoError::MixtureConvergence(
            "components not separated: DE posterior already above target at zero"
                .to_string(),
        ));
    }
    for i in 1..=steps {
        let m = max_x * i as f64 / steps as f64;
        if posterior(m) >= target {
            return Ok(m);
        }
    }
    Err(AtoError::MixtureConvergence(format!(
        "DE-component posterior never reached {:.2} within the observed logFC range",
        target
    )))
}
