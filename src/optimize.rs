//! Optimizer facade: orchestrates π0 estimation, p-value adjustment, and
//! effect-size cutoff estimation into a single threshold optimization.
//!
//! One call to [`optimize_thresholds`] owns its input table for the
//! duration of the computation and returns an immutable
//! [`ThresholdResult`]; derived views ([`get_significant_genes`],
//! [`compare_thresholds`]) never mutate it. The whole pipeline is
//! deterministic: rerunning with identical inputs produces bit-identical
//! results.

use crate::adjust::{
    adjust_pvalues_with_pi0, resolve_storey, select_method, AdjustMethod,
};
use crate::cutoff::{estimate_cutoff, CutoffMethod, CutoffParams};
use crate::data::{FeatureRecord, FeatureTable};
use crate::error::{AtoError, Result};
use crate::goal::{Goal, GoalPolicy};
use crate::pi0::{estimate_pi0, Pi0Estimate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Conventional fixed thresholds, reported for comparison only.
const TRADITIONAL_LOGFC: f64 = 1.0;
const TRADITIONAL_PADJ: f64 = 0.05;

/// Options controlling one optimization call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeOptions {
    /// Explicit adjustment method; `None` lets the selection policy choose.
    pub padj_method: Option<AdjustMethod>,
    /// Cutoff estimation method (`Auto` runs the consensus).
    pub logfc_method: CutoffMethod,
    /// Group sizes for the power estimator, when known.
    pub n1: Option<usize>,
    pub n2: Option<usize>,
    /// Caller hint that features may be negatively correlated.
    pub negatively_correlated: bool,
    /// Print progress to stderr.
    pub verbose: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            padj_method: None,
            logfc_method: CutoffMethod::Auto,
            n1: None,
            n2: None,
            negatively_correlated: false,
            verbose: false,
        }
    }
}

/// One input record annotated with the recomputed adjusted p-value and the
/// significance call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    /// The original record, untouched.
    #[serde(flatten)]
    pub record: FeatureRecord,
    /// Adjusted p-value under the chosen method (`None` when not evaluated).
    pub padj: Option<f64>,
    /// Passes both optimized thresholds.
    pub significant: bool,
    /// Participated in statistical computation (finite p-value and logFC).
    pub evaluated: bool,
}

/// The input table annotated with adjusted p-values and significance flags,
/// in the original insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    rows: Vec<AnnotatedRecord>,
}

impl ResultsTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Borrow the rows.
    pub fn rows(&self) -> &[AnnotatedRecord] {
        &self.rows
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &AnnotatedRecord> {
        self.rows.iter()
    }

    /// Count rows flagged significant.
    pub fn n_significant(&self) -> usize {
        self.rows.iter().filter(|r| r.significant).count()
    }

    /// Write the annotated table as TSV.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "id\tlog_fc\tp_value\tpadj\tbase_mean\tlfc_se\tsignificant\tevaluated"
        )?;
        for row in &self.rows {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                row.record.id,
                fmt_cell(Some(row.record.log_fc)),
                fmt_cell(row.record.p_value),
                fmt_cell(row.padj),
                fmt_cell(row.record.base_mean),
                fmt_cell(row.record.lfc_se),
                row.significant,
                row.evaluated,
            )?;
        }
        Ok(())
    }
}

fn fmt_cell(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{:.6e}", x),
        _ => "NA".to_string(),
    }
}

/// The immutable outcome of one threshold optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdResult {
    /// Analysis goal the thresholds were optimized for.
    pub goal: Goal,
    /// Optimized |logFC| cutoff (inclusive).
    pub logfc_cutoff: f64,
    /// Optimized adjusted p-value cutoff (inclusive).
    pub padj_cutoff: f64,
    /// Adjustment procedure actually applied.
    pub padj_method: AdjustMethod,
    /// Cutoff estimation method actually used.
    pub logfc_method: CutoffMethod,
    /// Estimated null proportion, when defined.
    pub pi0: Option<f64>,
    /// Total input features.
    pub n_features: usize,
    /// Features that participated in statistics.
    pub n_evaluated: usize,
    /// Significant features under the optimized thresholds.
    pub n_significant_optimized: usize,
    /// Significant features under |logFC| > 1 and padj < 0.05, for comparison.
    pub n_significant_traditional: usize,
    /// Why this adjustment method, including any fallback taken.
    pub padj_reasoning: String,
    /// Why this cutoff, including skipped estimators.
    pub logfc_reasoning: String,
    /// How π0 was obtained.
    pub pi0_reasoning: String,
    /// The annotated results table.
    pub table: ResultsTable,
}

impl ThresholdResult {
    /// Multi-line human-readable summary.
    pub fn summary(&self) -> String {
        format!("{}", self)
    }

    /// Publication-ready methods paragraph.
    pub fn methods_text(&self) -> String {
        let pi0_clause = match self.pi0 {
            Some(pi0) => format!(
                " The proportion of truly null features was estimated at {:.3}.",
                pi0
            ),
            None => String::new(),
        };
        format!(
            "Significance thresholds were optimized for a {} analysis rather \
             than applying fixed conventions. Raw p-values were corrected for \
             multiple testing with the {} procedure and genes were called \
             differentially expressed at adjusted p <= {} and |log2 fold \
             change| >= {:.3}, the latter derived from the data by the {} \
             method.{} Under these thresholds {} of {} genes were significant \
             (a conventional |log2FC| > 1, adjusted p < 0.05 filter would \
             yield {}).",
            self.goal,
            self.padj_method,
            self.padj_cutoff,
            self.logfc_cutoff,
            self.logfc_method,
            pi0_clause,
            self.n_significant_optimized,
            self.n_features,
            self.n_significant_traditional,
        )
    }
}

impl fmt::Display for ThresholdResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Adaptive Threshold Optimization ({} goal)", self.goal)?;
        writeln!(f, "  Features:              {}", self.n_features)?;
        writeln!(f, "  Evaluated:             {}", self.n_evaluated)?;
        match self.pi0 {
            Some(pi0) => writeln!(f, "  Estimated pi0:         {:.3}", pi0)?,
            None => writeln!(f, "  Estimated pi0:         undefined")?,
        }
        writeln!(f, "  Adjustment method:     {}", self.padj_method)?;
        writeln!(f, "  Padj cutoff:           {}", self.padj_cutoff)?;
        writeln!(f, "  LogFC method:          {}", self.logfc_method)?;
        writeln!(f, "  LogFC cutoff:          {:.4}", self.logfc_cutoff)?;
        writeln!(
            f,
            "  Significant (optimized):   {}",
            self.n_significant_optimized
        )?;
        writeln!(
            f,
            "  Significant (traditional): {}",
            self.n_significant_traditional
        )?;
        writeln!(f, "  Padj reasoning:  {}", self.padj_reasoning)?;
        writeln!(f, "  LogFC reasoning: {}", self.logfc_reasoning)?;
        writeln!(f, "  Pi0 reasoning:   {}", self.pi0_reasoning)?;
        Ok(())
    }
}

/// Stateful wrapper mirroring the function-style API, for callers that want
/// to reuse one resolved table across calls.
#[derive(Debug, Clone)]
pub struct AdaptiveThresholdOptimizer {
    table: FeatureTable,
    goal: Goal,
    verbose: bool,
}

impl AdaptiveThresholdOptimizer {
    /// Wrap a resolved table with an analysis goal.
    pub fn new(table: FeatureTable, goal: Goal) -> Self {
        Self {
            table,
            goal,
            verbose: false,
        }
    }

    /// Enable progress output on stderr.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Borrow the underlying table.
    pub fn table(&self) -> &FeatureTable {
        &self.table
    }

    /// Run the optimization with the given options.
    pub fn optimize(&self, options: &OptimizeOptions) -> Result<ThresholdResult> {
        let mut opts = options.clone();
        opts.verbose = opts.verbose || self.verbose;
        optimize_thresholds(&self.table, self.goal, &opts)
    }
}

/// Optimize significance thresholds for a resolved feature table.
pub fn optimize_thresholds(
    table: &FeatureTable,
    goal: Goal,
    options: &OptimizeOptions,
) -> Result<ThresholdResult> {
    if table.is_empty() {
        return Err(AtoError::EmptyData(
            "cannot optimize thresholds for an empty table".to_string(),
        ));
    }

    let policy = GoalPolicy::new(goal);
    let verbose = options.verbose;

    // Null-proportion estimate feeds both Storey and the selection policy.
    let p_values = table.evaluable_p_values();
    let pi0 = estimate_pi0(&p_values);
    if verbose {
        eprintln!("[ato] {}", pi0.reasoning);
    }

    let (padj_method, padj_reasoning) =
        choose_adjustment(&policy, &pi0, options);
    if verbose {
        eprintln!("[ato] {}", padj_reasoning);
    }

    let adjusted = adjust_pvalues_with_pi0(&p_values, padj_method, pi0.value_or(1.0));

    // Annotate records with the recomputed padj; the cutoff estimators
    // calibrate their null sets against these values.
    let evaluable = table.evaluable_indices();
    let mut padj_by_row: Vec<Option<f64>> = vec![None; table.len()];
    for (adj_idx, &row_idx) in evaluable.iter().enumerate() {
        padj_by_row[row_idx] = Some(adjusted[adj_idx]);
    }
    let working: Vec<FeatureRecord> = table
        .iter()
        .zip(&padj_by_row)
        .map(|(r, padj)| {
            let mut rec = r.clone();
            rec.p_adj = *padj;
            rec
        })
        .collect();

    let cutoff_params = CutoffParams::from_policy(&policy, options.n1, options.n2);
    let cutoff = estimate_cutoff(&working, options.logfc_method, &cutoff_params)?;
    if verbose {
        eprintln!("[ato] {}", cutoff.reasoning);
    }

    let padj_cutoff = policy.fdr_target;
    let rows: Vec<AnnotatedRecord> = working
        .into_iter()
        .map(|record| {
            let evaluated = record.is_evaluable();
            let significant = evaluated
                && record.p_adj.map(|q| q <= padj_cutoff).unwrap_or(false)
                && record.log_fc.abs() >= cutoff.value;
            AnnotatedRecord {
                padj: record.p_adj,
                significant,
                evaluated,
                record,
            }
        })
        .collect();

    let n_significant_optimized = rows.iter().filter(|r| r.significant).count();
    let n_significant_traditional = rows
        .iter()
        .filter(|r| {
            r.evaluated
                && r.padj.map(|q| q < TRADITIONAL_PADJ).unwrap_or(false)
                && r.record.log_fc.abs() > TRADITIONAL_LOGFC
        })
        .count();

    Ok(ThresholdResult {
        goal,
        logfc_cutoff: cutoff.value,
        padj_cutoff,
        padj_method,
        logfc_method: cutoff.method,
        pi0: pi0.value,
        n_features: table.len(),
        n_evaluated: evaluable.len(),
        n_significant_optimized,
        n_significant_traditional,
        padj_reasoning,
        logfc_reasoning: cutoff.reasoning,
        pi0_reasoning: pi0.reasoning,
        table: ResultsTable { rows },
    })
}

/// Resolve the adjustment method: explicit request (with the Storey/π0
/// substitution) or the selection policy.
fn choose_adjustment(
    policy: &GoalPolicy,
    pi0: &Pi0Estimate,
    options: &OptimizeOptions,
) -> (AdjustMethod, String) {
    match options.padj_method {
        Some(requested) => {
            let (method, note) = resolve_storey(requested, pi0);
            let reasoning = match note {
                Some(note) => note,
                None => format!("{} requested explicitly by caller", method),
            };
            (method, reasoning)
        }
        None => {
            let selection = select_method(policy, pi0, options.negatively_correlated);
            (selection.method, selection.reasoning)
        }
    }
}

/// Filter a result down to its significant genes.
///
/// Overrides replace the optimized thresholds for this view only; the
/// result itself is never mutated. Returned records carry the recomputed
/// adjusted p-values.
pub fn get_significant_genes(
    result: &ThresholdResult,
    logfc_cutoff: Option<f64>,
    padj_cutoff: Option<f64>,
) -> FeatureTable {
    let logfc_cutoff = logfc_cutoff.unwrap_or(result.logfc_cutoff);
    let padj_cutoff = padj_cutoff.unwrap_or(result.padj_cutoff);
    let records: Vec<FeatureRecord> = result
        .table
        .iter()
        .filter(|row| {
            row.evaluated
                && row.padj.map(|q| q <= padj_cutoff).unwrap_or(false)
                && row.record.log_fc.abs() >= logfc_cutoff
        })
        .map(|row| row.record.clone())
        .collect();
    FeatureTable::new_unchecked(records)
}

/// Grid of significant-gene counts across threshold combinations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdGrid {
    /// |logFC| cutoffs, one per grid row.
    pub logfc_values: Vec<f64>,
    /// Adjusted p-value cutoffs, one per grid column.
    pub padj_values: Vec<f64>,
    /// counts[i][j] = significant genes at (logfc_values[i], padj_values[j]).
    pub counts: Vec<Vec<usize>>,
}

impl ThresholdGrid {
    /// Count at a grid cell.
    pub fn get(&self, logfc_idx: usize, padj_idx: usize) -> Option<usize> {
        self.counts.get(logfc_idx)?.get(padj_idx).copied()
    }

    /// Write the grid as long-form TSV (one row per combination).
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "logfc_cutoff\tpadj_cutoff\tn_significant")?;
        for (i, &lfc) in self.logfc_values.iter().enumerate() {
            for (j, &padj) in self.padj_values.iter().enumerate() {
                writeln!(writer, "{}\t{}\t{}", lfc, padj, self.counts[i][j])?;
            }
        }
        Ok(())
    }
}

/// Sweep significant-gene counts over a threshold grid.
///
/// Pure function of the annotated table; used for sensitivity reporting and
/// heatmap rendering. Rows are computed in parallel.
pub fn compare_thresholds(
    table: &ResultsTable,
    logfc_grid: &[f64],
    padj_grid: &[f64],
) -> ThresholdGrid {
    let counts: Vec<Vec<usize>> = logfc_grid
        .par_iter()
        .map(|&lfc| {
            padj_grid
                .iter()
                .map(|&padj| {
                    table
                        .iter()
                        .filter(|row| {
                            row.evaluated
                                && row.padj.map(|q| q <= padj).unwrap_or(false)
                                && row.record.log_fc.abs() >= lfc
                        })
                        .count()
                })
                .collect()
        })
        .collect();

    ThresholdGrid {
        logfc_values: logfc_grid.to_vec(),
        padj_values: padj_grid.to_vec(),
        counts,
    }
}

/// Adjusted p-values under all six procedures, side by side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentComparison {
    /// Feature identifiers of the evaluable records, in table order.
    pub ids: Vec<String>,
    /// Methods compared, matching `adjusted` rows.
    pub methods: Vec<AdjustMethod>,
    /// adjusted[m][i] = padj of feature i under methods[m].
    pub adjusted: Vec<Vec<f64>>,
    /// Significant count per method at the given alpha.
    pub n_significant: Vec<usize>,
    /// Alpha the counts were taken at.
    pub alpha: f64,
}

/// Compare all six adjustment procedures on one table.
///
/// Storey uses the table's own π0 estimate (π0 = 1, i.e. BH-equivalent,
/// when the estimate is undefined).
pub fn adjustment_comparison(table: &FeatureTable, alpha: f64) -> Result<AdjustmentComparison> {
    let p_values = table.evaluable_p_values();
    if p_values.is_empty() {
        return Err(AtoError::EmptyData(
            "no evaluable p-values to compare adjustment methods on".to_string(),
        ));
    }
    let pi0 = estimate_pi0(&p_values).value_or(1.0);

    let ids: Vec<String> = table
        .iter()
        .filter(|r| r.is_evaluable())
        .map(|r| r.id.clone())
        .collect();
    let methods: Vec<AdjustMethod> = AdjustMethod::ALL.to_vec();
    let adjusted: Vec<Vec<f64>> = methods
        .iter()
        .map(|&m| adjust_pvalues_with_pi0(&p_values, m, pi0))
        .collect();
    let n_significant = adjusted
        .iter()
        .map(|q| q.iter().filter(|&&v| v < alpha).count())
        .collect();

    Ok(AdjustmentComparison {
        ids,
        methods,
        adjusted,
        n_significant,
        alpha,
    })
}
