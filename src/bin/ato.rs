//! ATO - Adaptive Threshold Optimizer CLI
//!
//! Command-line interface for data-driven DE significance thresholds.

use adaptive_thresholds::adjust::{adjust_pvalues_with_pi0, AdjustMethod};
use adaptive_thresholds::cutoff::CutoffMethod;
use adaptive_thresholds::data::FeatureTable;
use adaptive_thresholds::error::Result;
use adaptive_thresholds::goal::Goal;
use adaptive_thresholds::optimize::{
    adjustment_comparison, compare_thresholds, get_significant_genes, optimize_thresholds,
    OptimizeOptions,
};
use adaptive_thresholds::pi0::estimate_pi0;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// CLI-friendly analysis goal.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliGoal {
    /// Maximize sensitivity (screening experiments)
    Discovery,
    /// Default sensitivity/specificity trade-off
    Balanced,
    /// Minimize false positives (confirmation experiments)
    Validation,
}

impl From<CliGoal> for Goal {
    fn from(goal: CliGoal) -> Self {
        match goal {
            CliGoal::Discovery => Goal::Discovery,
            CliGoal::Balanced => Goal::Balanced,
            CliGoal::Validation => Goal::Validation,
        }
    }
}

/// CLI-friendly adjustment method, with auto-selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAdjustMethod {
    /// Let the selection policy choose
    Auto,
    /// Benjamini-Hochberg FDR
    Bh,
    /// Benjamini-Yekutieli FDR (arbitrary dependence)
    By,
    /// Holm step-down FWER
    Holm,
    /// Hochberg step-up FWER
    Hochberg,
    /// Bonferroni FWER
    Bonferroni,
    /// Storey q-values
    Storey,
}

impl CliAdjustMethod {
    fn to_option(self) -> Option<AdjustMethod> {
        match self {
            Self::Auto => None,
            Self::Bh => Some(AdjustMethod::Bh),
            Self::By => Some(AdjustMethod::By),
            Self::Holm => Some(AdjustMethod::Holm),
            Self::Hochberg => Some(AdjustMethod::Hochberg),
            Self::Bonferroni => Some(AdjustMethod::Bonferroni),
            Self::Storey => Some(AdjustMethod::Storey),
        }
    }
}

/// CLI-friendly cutoff method.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCutoffMethod {
    /// Consensus over all estimators
    Auto,
    /// Robust null-set spread
    Mad,
    /// Gaussian mixture posterior crossing
    Mixture,
    /// Minimum detectable effect
    Power,
    /// Null-set 95th percentile
    Percentile,
}

impl From<CliCutoffMethod> for CutoffMethod {
    fn from(method: CliCutoffMethod) -> Self {
        match method {
            CliCutoffMethod::Auto => CutoffMethod::Auto,
            CliCutoffMethod::Mad => CutoffMethod::Mad,
            CliCutoffMethod::Mixture => CutoffMethod::Mixture,
            CliCutoffMethod::Power => CutoffMethod::Power,
            CliCutoffMethod::Percentile => CutoffMethod::Percentile,
        }
    }
}

/// Adaptive Threshold Optimizer for differential expression tables
#[derive(Parser)]
#[command(name = "ato")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize thresholds for a DE results table
    Optimize {
        /// Path to the DE results table (CSV or TSV)
        #[arg(short, long)]
        input: PathBuf,

        /// Analysis goal
        #[arg(short, long, value_enum, default_value_t = CliGoal::Balanced)]
        goal: CliGoal,

        /// P-value adjustment method
        #[arg(long, value_enum, default_value_t = CliAdjustMethod::Auto)]
        padj_method: CliAdjustMethod,

        /// Effect-size cutoff method
        #[arg(long, value_enum, default_value_t = CliCutoffMethod::Auto)]
        logfc_method: CliCutoffMethod,

        /// Samples in group 1 (enables the power estimator without lfcSE)
        #[arg(long)]
        n1: Option<usize>,

        /// Samples in group 2
        #[arg(long)]
        n2: Option<usize>,

        /// Treat features as possibly negatively correlated
        #[arg(long)]
        negatively_correlated: bool,

        /// Output path for the annotated results table (TSV)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output path for the significant-gene table (TSV)
        #[arg(long)]
        significant: Option<PathBuf>,

        /// Output path for the structured result record (JSON)
        #[arg(long)]
        json: Option<PathBuf>,

        /// Print a publication-ready methods paragraph
        #[arg(long)]
        methods_text: bool,

        /// Print progress to stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// Sweep significant-gene counts over a threshold grid
    Compare {
        /// Path to the DE results table (CSV or TSV)
        #[arg(short, long)]
        input: PathBuf,

        /// Analysis goal used for the underlying adjustment
        #[arg(short, long, value_enum, default_value_t = CliGoal::Balanced)]
        goal: CliGoal,

        /// |logFC| cutoffs to sweep
        #[arg(long, value_delimiter = ',', default_value = "0.5,1.0,1.5,2.0")]
        logfc: Vec<f64>,

        /// Adjusted p-value cutoffs to sweep
        #[arg(long, value_delimiter = ',', default_value = "0.01,0.05,0.1")]
        padj: Vec<f64>,

        /// Output path for the grid (TSV); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply a single adjustment method and write the adjusted p-values
    Adjust {
        /// Path to the DE results table (CSV or TSV)
        #[arg(short, long)]
        input: PathBuf,

        /// Adjustment method (auto compares all six)
        #[arg(short, long, value_enum, default_value_t = CliAdjustMethod::Auto)]
        method: CliAdjustMethod,

        /// Output path (TSV); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Optimize {
            input,
            goal,
            padj_method,
            logfc_method,
            n1,
            n2,
            negatively_correlated,
            output,
            significant,
            json,
            methods_text,
            verbose,
        } => {
            let table = FeatureTable::from_path(&input)?;
            if verbose {
                eprintln!("[ato] loaded {} features from {}", table.len(), input.display());
            }
            let options = OptimizeOptions {
                padj_method: padj_method.to_option(),
                logfc_method: logfc_method.into(),
                n1,
                n2,
                negatively_correlated,
                verbose,
            };
            let result = optimize_thresholds(&table, goal.into(), &options)?;

            print!("{}", result.summary());
            if methods_text {
                println!("\n{}", result.methods_text());
            }
            if let Some(path) = output {
                result.table.to_tsv(&path)?;
                eprintln!("[ato] annotated table written to {}", path.display());
            }
            if let Some(path) = significant {
                let genes = get_significant_genes(&result, None, None);
                genes.to_tsv(&path)?;
                eprintln!(
                    "[ato] {} significant genes written to {}",
                    genes.len(),
                    path.display()
                );
            }
            if let Some(path) = json {
                let file = File::create(&path)?;
                serde_json::to_writer_pretty(BufWriter::new(file), &result)?;
                eprintln!("[ato] result record written to {}", path.display());
            }
            Ok(())
        }

        Commands::Compare {
            input,
            goal,
            logfc,
            padj,
            output,
        } => {
            let table = FeatureTable::from_path(&input)?;
            let result = optimize_thresholds(&table, goal.into(), &OptimizeOptions::default())?;
            let grid = compare_thresholds(&result.table, &logfc, &padj);

            match output {
                Some(path) => grid.to_tsv(&path)?,
                None => {
                    println!("logfc_cutoff\tpadj_cutoff\tn_significant");
                    for (i, &lfc) in grid.logfc_values.iter().enumerate() {
                        for (j, &q) in grid.padj_values.iter().enumerate() {
                            println!("{}\t{}\t{}", lfc, q, grid.counts[i][j]);
                        }
                    }
                }
            }
            Ok(())
        }

        Commands::Adjust {
            input,
            method,
            output,
        } => {
            let table = FeatureTable::from_path(&input)?;
            let mut out: Box<dyn Write> = match output {
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(std::io::stdout().lock()),
            };

            match method.to_option() {
                Some(method) => {
                    let p_values = table.evaluable_p_values();
                    let pi0 = estimate_pi0(&p_values).value_or(1.0);
                    let adjusted = adjust_pvalues_with_pi0(&p_values, method, pi0);
                    writeln!(out, "id\tp_value\tpadj_{}", method.name().to_lowercase())?;
                    let ids = table.iter().filter(|r| r.is_evaluable());
                    for (record, (p, q)) in ids.zip(p_values.iter().zip(&adjusted)) {
                        writeln!(out, "{}\t{:.6e}\t{:.6e}", record.id, p, q)?;
                    }
                }
                None => {
                    let cmp = adjustment_comparison(&table, 0.05)?;
                    let header: Vec<String> =
                        cmp.methods.iter().map(|m| m.name().to_string()).collect();
                    writeln!(out, "id\t{}", header.join("\t"))?;
                    for (i, id) in cmp.ids.iter().enumerate() {
                        let row: Vec<String> = cmp
                            .adjusted
                            .iter()
                            .map(|col| format!("{:.6e}", col[i]))
                            .collect();
                        writeln!(out, "{}\t{}", id, row.join("\t"))?;
                    }
                }
            }
            Ok(())
        }
    }
}
