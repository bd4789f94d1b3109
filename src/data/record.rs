//! Core record and table types for differential-expression results.

use crate::data::resolve;
use crate::error::{AtoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One gene or transcript from a differential-expression table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Feature identifier (unique within a table).
    pub id: String,
    /// Log-scale fold change (effect size).
    pub log_fc: f64,
    /// Raw p-value. `None` when missing from the source table.
    pub p_value: Option<f64>,
    /// Adjusted p-value from the source tool, if present.
    pub p_adj: Option<f64>,
    /// Mean expression level, if present.
    pub base_mean: Option<f64>,
    /// Standard error of the logFC estimate, if present.
    pub lfc_se: Option<f64>,
}

impl FeatureRecord {
    /// Create a record with only the mandatory fields.
    pub fn new(id: impl Into<String>, log_fc: f64, p_value: Option<f64>) -> Self {
        Self {
            id: id.into(),
            log_fc,
            p_value,
            p_adj: None,
            base_mean: None,
            lfc_se: None,
        }
    }

    /// Whether this record can participate in statistical computation.
    ///
    /// Requires a finite p-value in [0, 1] and a finite logFC. Records that
    /// fail this check are retained in output with a not-evaluated flag.
    pub fn is_evaluable(&self) -> bool {
        match self.p_value {
            Some(p) => p.is_finite() && (0.0..=1.0).contains(&p) && self.log_fc.is_finite(),
            None => false,
        }
    }
}

/// Ordered collection of feature records.
///
/// Insertion order is preserved for output; computation never depends on it.
/// Duplicate identifiers are rejected at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    records: Vec<FeatureRecord>,
}

impl FeatureTable {
    /// Create a table, validating identifier uniqueness.
    pub fn new(records: Vec<FeatureRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for r in &records {
            if !seen.insert(r.id.as_str()) {
                return Err(AtoError::Schema(format!(
                    "duplicate feature identifier '{}'",
                    r.id
                )));
            }
        }
        Ok(Self { records })
    }

    /// Build a table from records whose identifiers are already known to be
    /// unique (filtered views of a validated table).
    pub(crate) fn new_unchecked(records: Vec<FeatureRecord>) -> Self {
        Self { records }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Borrow the records in insertion order.
    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    /// Iterate over records.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureRecord> {
        self.records.iter()
    }

    /// Look up a record by identifier.
    pub fn get(&self, id: &str) -> Option<&FeatureRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Indices of records that can participate in statistics.
    pub fn evaluable_indices(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_evaluable())
            .map(|(i, _)| i)
            .collect()
    }

    /// Raw p-values of evaluable records, in table order.
    pub fn evaluable_p_values(&self) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.is_evaluable())
            .map(|r| r.p_value.unwrap_or(f64::NAN))
            .collect()
    }

    /// Load a table from a delimited file, resolving tool-specific column
    /// names to the canonical schema. The delimiter is taken from the file
    /// extension (`.csv` is comma-separated, anything else tab-separated).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let delim = match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("csv") => b',',
            _ => b'\t',
        };
        let file = File::open(path)?;
        resolve::table_from_reader(file, delim)
    }

    /// Write the table as TSV with canonical column names.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "id\tlog_fc\tp_value\tp_adj\tbase_mean\tlfc_se")?;
        for r in &self.records {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}",
                r.id,
                fmt_opt(Some(r.log_fc)),
                fmt_opt(r.p_value),
                fmt_opt(r.p_adj),
                fmt_opt(r.base_mean),
                fmt_opt(r.lfc_se),
            )?;
        }
        Ok(())
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{:.6e}", x),
        _ => "NA".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_ids_rejected() {
        let records = vec![
            FeatureRecord::new("gene_1", 1.0, Some(0.01)),
            FeatureRecord::new("gene_1", -0.5, Some(0.5)),
        ];
        let err = FeatureTable::new(records).unwrap_err();
        assert!(matches!(err, AtoError::Schema(_)));
    }

    #[test]
    fn test_evaluable() {
        assert!(FeatureRecord::new("a", 1.0, Some(0.5)).is_evaluable());
        assert!(!FeatureRecord::new("b", 1.0, None).is_evaluable());
        assert!(!FeatureRecord::new("c", 1.0, Some(f64::NAN)).is_evaluable());
        assert!(!FeatureRecord::new("d", 1.0, Some(1.5)).is_evaluable());
        assert!(!FeatureRecord::new("e", f64::NAN, Some(0.5)).is_evaluable());
    }

    #[test]
    fn test_evaluable_indices() {
        let table = FeatureTable::new(vec![
            FeatureRecord::new("a", 1.0, Some(0.1)),
            FeatureRecord::new("b", 0.2, None),
            FeatureRecord::new("c", -0.3, Some(0.9)),
        ])
        .unwrap();
        assert_eq!(table.evaluable_indices(), vec![0, 2]);
        assert_eq!(table.evaluable_p_values(), vec![0.1, 0.9]);
    }

    #[test]
    fn test_order_preserved() {
        let ids = ["z", "a", "m"];
        let table = FeatureTable::new(
            ids.iter()
                .map(|id| FeatureRecord::new(*id, 0.0, Some(0.5)))
                .collect(),
        )
        .unwrap();
        let out: Vec<&str> = table.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(out, ids);
    }
}
