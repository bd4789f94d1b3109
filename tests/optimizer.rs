//! Integration tests for the adaptive threshold optimizer.

use adaptive_thresholds::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// Deterministic LCG random number generator for reproducible test data.
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn uniform(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (((self.state >> 11) as f64) / ((1u64 << 53) as f64)).max(1e-15)
    }

    fn normal(&mut self) -> f64 {
        let u1 = self.uniform();
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// Synthetic DE table: `n_de` true positives with p-values near zero and
/// |logFC| around 2.5, the rest null with uniform p-values and small noise.
fn synthetic_table(n_total: usize, n_de: usize, seed: u64) -> FeatureTable {
    let mut rng = SimpleRng::new(seed);
    let mut records = Vec::with_capacity(n_total);
    for i in 0..n_de {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        let mut r = FeatureRecord::new(
            format!("de_{}", i),
            sign * (2.5 + 0.1 * rng.normal()),
            Some(rng.uniform() * 1e-6),
        );
        r.lfc_se = Some((0.1 + 0.02 * rng.normal()).abs().max(0.01));
        records.push(r);
    }
    for i in 0..(n_total - n_de) {
        let mut r = FeatureRecord::new(
            format!("null_{}", i),
            0.2 * rng.normal(),
            Some(rng.uniform()),
        );
        r.lfc_se = Some((0.1 + 0.02 * rng.normal()).abs().max(0.01));
        records.push(r);
    }
    FeatureTable::new(records).unwrap()
}

#[test]
fn test_recovery_scenario() {
    // 10,000 features, 500 true positives: pi0 near 0.95, BH and Storey
    // both recover at least 450 of the 500, mad cutoff well below the
    // conventional 1.0.
    let table = synthetic_table(10_000, 500, 42);

    let pi0 = estimate_pi0(&table.evaluable_p_values());
    let pi0_value = pi0.value.unwrap();
    assert!(
        pi0_value > 0.85 && pi0_value <= 1.0,
        "pi0 = {}",
        pi0_value
    );

    let p_values = table.evaluable_p_values();
    for method in [AdjustMethod::Bh, AdjustMethod::Storey] {
        let adjusted = adjust_pvalues_with_pi0(&p_values, method, pi0_value);
        let recovered = table
            .iter()
            .filter(|r| r.is_evaluable())
            .zip(&adjusted)
            .filter(|(r, &q)| r.id.starts_with("de_") && q < 0.05)
            .count();
        assert!(
            recovered >= 450,
            "{} recovered only {} of 500",
            method.name(),
            recovered
        );
    }

    let result = optimize_thresholds(
        &table,
        Goal::Balanced,
        &OptimizeOptions {
            logfc_method: CutoffMethod::Mad,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(
        result.logfc_cutoff > 0.3 && result.logfc_cutoff < 1.0,
        "mad cutoff = {}",
        result.logfc_cutoff
    );
    assert!(result.n_significant_optimized >= 450);
}

#[test]
fn test_idempotence_bit_identical() {
    let table = synthetic_table(2_000, 100, 7);
    let options = OptimizeOptions::default();

    let a = optimize_thresholds(&table, Goal::Discovery, &options).unwrap();
    let b = optimize_thresholds(&table, Goal::Discovery, &options).unwrap();

    assert_eq!(a.logfc_cutoff.to_bits(), b.logfc_cutoff.to_bits());
    assert_eq!(a.padj_cutoff.to_bits(), b.padj_cutoff.to_bits());
    assert_eq!(a.padj_method, b.padj_method);
    assert_eq!(a.n_significant_optimized, b.n_significant_optimized);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn test_roundtrip_significant_genes() {
    let table = synthetic_table(5_000, 250, 13);
    let result = optimize_thresholds(&table, Goal::Balanced, &OptimizeOptions::default()).unwrap();

    let sig = get_significant_genes(&result, None, None);
    assert_eq!(sig.len(), result.n_significant_optimized);
    for r in sig.iter() {
        assert!(r.log_fc.abs() >= result.logfc_cutoff);
        assert!(r.p_adj.unwrap() <= result.padj_cutoff);
    }
}

#[test]
fn test_all_pvalues_one() {
    // Every method must report zero significant genes; pi0 collapses to 1.
    let mut rng = SimpleRng::new(3);
    let records: Vec<FeatureRecord> = (0..200)
        .map(|i| {
            let mut r = FeatureRecord::new(format!("g{}", i), 0.2 * rng.normal(), Some(1.0));
            r.lfc_se = Some(0.1);
            r
        })
        .collect();
    let table = FeatureTable::new(records).unwrap();

    let pi0 = estimate_pi0(&table.evaluable_p_values());
    assert_eq!(pi0.value, Some(1.0));

    let p_values = table.evaluable_p_values();
    for method in AdjustMethod::ALL {
        let adjusted = adjust_pvalues_with_pi0(&p_values, method, 1.0);
        assert_eq!(adjusted.iter().filter(|&&q| q < 0.05).count(), 0);
    }

    let result = optimize_thresholds(&table, Goal::Balanced, &OptimizeOptions::default()).unwrap();
    assert_eq!(result.n_significant_optimized, 0);
    assert_eq!(result.n_significant_traditional, 0);
}

#[test]
fn test_degenerate_constant_pvalues() {
    // 50 features, every p-value exactly 0.5: the smoother cannot run, the
    // naive fallback gives pi0 = 1.0, and the call completes without error.
    let mut rng = SimpleRng::new(9);
    let records: Vec<FeatureRecord> = (0..50)
        .map(|i| {
            let mut r = FeatureRecord::new(format!("g{}", i), 0.1 * rng.normal(), Some(0.5));
            r.lfc_se = Some(0.1);
            r
        })
        .collect();
    let table = FeatureTable::new(records).unwrap();

    let pi0 = estimate_pi0(&table.evaluable_p_values());
    assert_eq!(pi0.method, Pi0Method::Naive);
    assert_eq!(pi0.value, Some(1.0));

    let result = optimize_thresholds(&table, Goal::Balanced, &OptimizeOptions::default()).unwrap();
    assert_eq!(result.n_significant_optimized, 0);
    assert_eq!(result.pi0, Some(1.0));
}

#[test]
fn test_insufficient_null_set_explicit_vs_auto() {
    // Too few low-significance features for mad/percentile calibration.
    let mut records: Vec<FeatureRecord> = (0..10)
        .map(|i| {
            let mut r = FeatureRecord::new(format!("g{}", i), 1.5, Some(0.001 * (i + 1) as f64));
            r.lfc_se = Some(0.2);
            r
        })
        .collect();
    records.push(FeatureRecord::new("null_0", 0.1, Some(0.9)));
    let table = FeatureTable::new(records).unwrap();

    // Explicit request: the error is fatal and typed.
    let err = optimize_thresholds(
        &table,
        Goal::Balanced,
        &OptimizeOptions {
            logfc_method: CutoffMethod::Mad,
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, AtoError::InsufficientNullSet { .. }));

    // Auto: silently recovers through the power estimator and says so.
    let result = optimize_thresholds(&table, Goal::Balanced, &OptimizeOptions::default()).unwrap();
    assert_eq!(result.logfc_method, CutoffMethod::Auto);
    assert!(result.logfc_reasoning.contains("mad skipped"));
    assert!(result.logfc_reasoning.contains("power = "));
}

#[test]
fn test_compare_thresholds_grid_monotone() {
    let table = synthetic_table(4_000, 300, 21);
    let result = optimize_thresholds(&table, Goal::Balanced, &OptimizeOptions::default()).unwrap();

    let logfc_grid = [0.5, 1.0, 1.5, 2.0];
    let padj_grid = [0.1, 0.05, 0.01];
    let grid = compare_thresholds(&result.table, &logfc_grid, &padj_grid);

    assert_eq!(grid.counts.len(), 4);
    assert_eq!(grid.counts[0].len(), 3);
    // Tightening logFC (down the rows) or padj (across the columns, which
    // are ordered loose to tight here) never increases the count.
    for i in 0..4 {
        for j in 0..3 {
            if i + 1 < 4 {
                assert!(grid.counts[i][j] >= grid.counts[i + 1][j]);
            }
            if j + 1 < 3 {
                assert!(grid.counts[i][j] >= grid.counts[i][j + 1]);
            }
        }
    }
}

#[test]
fn test_goal_stringency_ordering() {
    let table = synthetic_table(5_000, 400, 33);

    let discovery =
        optimize_thresholds(&table, Goal::Discovery, &OptimizeOptions::default()).unwrap();
    let validation =
        optimize_thresholds(&table, Goal::Validation, &OptimizeOptions::default()).unwrap();

    assert!(discovery.padj_cutoff > validation.padj_cutoff);
    assert!(discovery.n_significant_optimized >= validation.n_significant_optimized);
}

#[test]
fn test_csv_end_to_end() {
    // DESeq2-style CSV through the resolver, optimizer, and TSV writers.
    let mut rng = SimpleRng::new(17);
    let mut file = NamedTempFile::with_suffix(".csv").unwrap();
    writeln!(file, "gene_id,baseMean,log2FoldChange,lfcSE,pvalue,padj").unwrap();
    for i in 0..300 {
        let (lfc, p) = if i < 30 {
            (2.0 + 0.2 * rng.normal(), rng.uniform() * 1e-7)
        } else {
            (0.15 * rng.normal(), rng.uniform())
        };
        writeln!(
            file,
            "Gene_{},{:.2},{:.4},0.12,{:.6e},NA",
            i,
            100.0 + 50.0 * rng.uniform(),
            lfc,
            p
        )
        .unwrap();
    }
    file.flush().unwrap();

    let table = FeatureTable::from_path(file.path()).unwrap();
    assert_eq!(table.len(), 300);
    assert_eq!(table.records()[0].id, "Gene_0");
    assert_eq!(table.records()[0].lfc_se, Some(0.12));

    let result = optimize_thresholds(&table, Goal::Balanced, &OptimizeOptions::default()).unwrap();
    assert!(result.n_significant_optimized >= 25);
    assert!(result.n_significant_optimized <= 35);

    let out = NamedTempFile::new().unwrap();
    result.table.to_tsv(out.path()).unwrap();
    let content = std::fs::read_to_string(out.path()).unwrap();
    assert!(content.starts_with("id\tlog_fc\tp_value\tpadj"));
    assert_eq!(content.lines().count(), 301);
}

#[test]
fn test_adjustment_comparison_power_ordering() {
    let table = synthetic_table(3_000, 200, 5);
    let cmp = adjustment_comparison(&table, 0.05).unwrap();

    // Methods are listed most conservative first; counts must be
    // non-decreasing along that order.
    for w in cmp.n_significant.windows(2) {
        assert!(w[0] <= w[1], "counts not ordered: {:?}", cmp.n_significant);
    }
    assert_eq!(cmp.methods[0], AdjustMethod::Bonferroni);
    assert_eq!(cmp.methods[5], AdjustMethod::Storey);
}

#[test]
fn test_explicit_storey_honored_when_pi0_defined() {
    // Small table below the smoother minimum: pi0 comes from the naive
    // path but is still defined, so an explicit Storey request runs as-is.
    let mut records: Vec<FeatureRecord> = (0..30)
        .map(|i| {
            let mut r = FeatureRecord::new(format!("g{}", i), 0.1 * (i as f64 - 15.0), Some(0.6));
            r.lfc_se = Some(0.1);
            r
        })
        .collect();
    records.push(FeatureRecord::new("sig", 2.0, Some(0.0001)));
    let table = FeatureTable::new(records).unwrap();

    let result = optimize_thresholds(
        &table,
        Goal::Balanced,
        &OptimizeOptions {
            padj_method: Some(AdjustMethod::Storey),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(result.padj_method, AdjustMethod::Storey);
    assert!(result.pi0.is_some());
}

#[test]
fn test_result_never_mutated_by_views() {
    let table = synthetic_table(1_000, 50, 11);
    let result = optimize_thresholds(&table, Goal::Balanced, &OptimizeOptions::default()).unwrap();
    let before = serde_json::to_string(&result).unwrap();

    let _ = get_significant_genes(&result, Some(0.0), Some(1.0));
    let _ = compare_thresholds(&result.table, &[0.5, 1.0], &[0.05]);

    let after = serde_json::to_string(&result).unwrap();
    assert_eq!(before, after);
}
