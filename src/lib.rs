//! Adaptive Threshold Optimizer (ATO)
//!
//! Data-driven significance thresholds for differential-expression gene
//! tables, replacing the fixed |log2FC| > 1, padj < 0.05 convention with
//! thresholds derived from the data's own null and alternative
//! distributions.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Record/table types and column resolution for DESeq2-, edgeR-,
//!   and limma-style schemas
//! - **pi0**: Null-proportion estimation from the p-value distribution
//! - **adjust**: Six multiple-testing corrections plus a selection policy
//! - **cutoff**: Four effect-size cutoff estimators plus a consensus mode
//! - **goal**: Analysis-goal policies (discovery / balanced / validation)
//! - **optimize**: The optimizer facade tying it all together
//!
//! # Example
//!
//! ```no_run
//! use adaptive_thresholds::prelude::*;
//!
//! let table = FeatureTable::from_path("deseq2_results.csv").unwrap();
//! let result = optimize_thresholds(&table, Goal::Discovery, &OptimizeOptions::default()).unwrap();
//!
//! println!("{}", result.summary());
//! let significant = get_significant_genes(&result, None, None);
//! println!("{} significant genes", significant.len());
//! ```

pub mod adjust;
pub mod cutoff;
pub mod data;
pub mod error;
pub mod goal;
pub mod optimize;
pub mod pi0;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::adjust::{
        adjust_pvalues, adjust_pvalues_with_pi0, select_method, AdjustMethod, AdjustSelection,
    };
    pub use crate::cutoff::{
        estimate_cutoff, estimate_cutoff_auto, estimate_cutoff_mad, estimate_cutoff_mixture,
        estimate_cutoff_percentile, estimate_cutoff_power, CutoffEstimate, CutoffMethod,
        CutoffParams, EstimatorOutcome, MixtureConfig,
    };
    pub use crate::data::{resolve_columns, FeatureRecord, FeatureTable};
    pub use crate::error::{AtoError, Result};
    pub use crate::goal::{Goal, GoalPolicy, TieBias};
    pub use crate::optimize::{
        adjustment_comparison, compare_thresholds, get_significant_genes, optimize_thresholds,
        AdaptiveThresholdOptimizer, AdjustmentComparison, AnnotatedRecord, OptimizeOptions,
        ResultsTable, ThresholdGrid, ThresholdResult,
    };
    pub use crate::pi0::{estimate_pi0, Pi0Estimate, Pi0Method};
}
