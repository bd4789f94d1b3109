//! Column resolution for heterogeneous DE-tool output schemas.
//!
//! DESeq2, edgeR, and limma all name the same logical columns differently
//! (`log2FoldChange` vs `logFC`, `padj` vs `adj.P.Val` vs `FDR`, ...). The
//! resolver maps a table's header row onto the canonical [`FeatureRecord`]
//! fields through a fixed alias table, so the statistical core never sees a
//! tool-specific name. Pure transform, no side effects.

use crate::data::{FeatureRecord, FeatureTable};
use crate::error::{AtoError, Result};
use std::io::Read;

/// Aliases recognized for the logFC column (mandatory).
const LOGFC_ALIASES: &[&str] = &["log2foldchange", "logfc", "log2fc", "lfc"];

/// Aliases recognized for the raw p-value column (mandatory).
const PVALUE_ALIASES: &[&str] = &["pvalue", "pval", "p"];

/// Aliases recognized for the adjusted p-value column (optional).
const PADJ_ALIASES: &[&str] = &["padj", "adjpval", "qvalue", "fdr"];

/// Aliases recognized for the mean expression column (optional).
const BASEMEAN_ALIASES: &[&str] = &["basemean", "aveexpr", "logcpm", "meanexpr"];

/// Aliases recognized for the logFC standard error column (optional).
const LFCSE_ALIASES: &[&str] = &["lfcse", "se", "stderror", "stderr"];

/// Aliases recognized for the identifier column.
const ID_ALIASES: &[&str] = &["gene", "geneid", "id", "feature", "featureid", "genename"];

/// Resolved positions of the canonical fields within a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    /// Identifier column, or `None` to use the row index.
    pub id: Option<usize>,
    /// Effect size column (mandatory).
    pub log_fc: usize,
    /// Raw p-value column (mandatory).
    pub p_value: usize,
    /// Adjusted p-value column.
    pub p_adj: Option<usize>,
    /// Mean expression column.
    pub base_mean: Option<usize>,
    /// logFC standard error column.
    pub lfc_se: Option<usize>,
}

/// Normalize a header for alias comparison: lowercase, separators stripped.
fn canonical(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn find_alias(headers: &[String], aliases: &[&str]) -> Option<usize> {
    // First exact alias wins; alias order encodes preference.
    for alias in aliases {
        if let Some(i) = headers.iter().position(|h| canonical(h) == *alias) {
            return Some(i);
        }
    }
    None
}

/// Resolve a header row to a [`ColumnMap`].
///
/// Fails with a schema error when no column matches the logFC or p-value
/// alias group. Optional groups resolve to `None` when unmatched.
pub fn resolve_columns(headers: &[String]) -> Result<ColumnMap> {
    let log_fc = find_alias(headers, LOGFC_ALIASES).ok_or_else(|| {
        AtoError::Schema(format!(
            "no logFC column found; recognized names: {:?}, got {:?}",
            LOGFC_ALIASES, headers
        ))
    })?;
    let p_value = find_alias(headers, PVALUE_ALIASES).ok_or_else(|| {
        AtoError::Schema(format!(
            "no p-value column found; recognized names: {:?}, got {:?}",
            PVALUE_ALIASES, headers
        ))
    })?;

    // An unnamed or alias-matching leading column is taken as the identifier,
    // the convention for tables written with row names.
    let id = find_alias(headers, ID_ALIASES).or_else(|| {
        let first = canonical(&headers[0]);
        if first.is_empty() && log_fc != 0 && p_value != 0 {
            Some(0)
        } else {
            None
        }
    });

    Ok(ColumnMap {
        id,
        log_fc,
        p_value,
        p_adj: find_alias(headers, PADJ_ALIASES),
        base_mean: find_alias(headers, BASEMEAN_ALIASES),
        lfc_se: find_alias(headers, LFCSE_ALIASES),
    })
}

/// Parse a numeric cell; `NA`-style placeholders and bad numbers map to `None`.
fn parse_cell(field: Option<&str>) -> Option<f64> {
    let s = field?.trim();
    if s.is_empty() {
        return None;
    }
    match s.to_ascii_lowercase().as_str() {
        "na" | "nan" | "null" | "none" | "." => None,
        _ => s.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

/// Read a delimited table and resolve it to a canonical [`FeatureTable`].
pub fn table_from_reader<R: Read>(reader: R, delimiter: u8) -> Result<FeatureTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() {
        return Err(AtoError::EmptyData("table has no header row".into()));
    }
    let map = resolve_columns(&headers)?;

    let mut records = Vec::new();
    for (row_idx, row) in csv_reader.records().enumerate() {
        let row = row?;
        let id = match map.id {
            Some(i) => row
                .get(i)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .unwrap_or_else(|| format!("feature_{}", row_idx)),
            None => format!("feature_{}", row_idx),
        };
        let log_fc = parse_cell(row.get(map.log_fc)).unwrap_or(f64::NAN);
        records.push(FeatureRecord {
            id,
            log_fc,
            p_value: parse_cell(row.get(map.p_value)),
            p_adj: map.p_adj.and_then(|i| parse_cell(row.get(i))),
            base_mean: map.base_mean.and_then(|i| parse_cell(row.get(i))),
            lfc_se: map.lfc_se.and_then(|i| parse_cell(row.get(i))),
        });
    }

    FeatureTable::new(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_deseq2_schema() {
        let map = resolve_columns(&headers(&[
            "gene_id",
            "baseMean",
            "log2FoldChange",
            "lfcSE",
            "stat",
            "pvalue",
            "padj",
        ]))
        .unwrap();
        assert_eq!(map.id, Some(0));
        assert_eq!(map.log_fc, 2);
        assert_eq!(map.p_value, 5);
        assert_eq!(map.p_adj, Some(6));
        assert_eq!(map.base_mean, Some(1));
        assert_eq!(map.lfc_se, Some(3));
    }

    #[test]
    fn test_limma_schema() {
        let map = resolve_columns(&headers(&[
            "gene", "logFC", "AveExpr", "t", "P.Value", "adj.P.Val", "B",
        ]))
        .unwrap();
        assert_eq!(map.log_fc, 1);
        assert_eq!(map.p_value, 4);
        assert_eq!(map.p_adj, Some(5));
        assert_eq!(map.base_mean, Some(2));
    }

    #[test]
    fn test_edger_schema() {
        let map =
            resolve_columns(&headers(&["feature", "logFC", "logCPM", "PValue", "FDR"])).unwrap();
        assert_eq!(map.log_fc, 1);
        assert_eq!(map.p_value, 3);
        assert_eq!(map.p_adj, Some(4));
        assert_eq!(map.base_mean, Some(2));
        assert_eq!(map.lfc_se, None);
    }

    #[test]
    fn test_missing_required_column() {
        let err = resolve_columns(&headers(&["gene", "logFC", "stat"])).unwrap_err();
        assert!(matches!(err, AtoError::Schema(_)));

        let err = resolve_columns(&headers(&["gene", "pvalue"])).unwrap_err();
        assert!(matches!(err, AtoError::Schema(_)));
    }

    #[test]
    fn test_table_from_reader_csv() {
        let data = "gene,log2FoldChange,pvalue,padj\n\
                    g1,2.5,0.001,0.01\n\
                    g2,-0.2,NA,NA\n\
                    g3,0.1,0.8,0.9\n";
        let table = table_from_reader(data.as_bytes(), b',').unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.records()[0].id, "g1");
        assert_eq!(table.records()[0].log_fc, 2.5);
        assert_eq!(table.records()[1].p_value, None);
        assert!(!table.records()[1].is_evaluable());
        assert_eq!(table.records()[2].p_adj, Some(0.9));
    }

    #[test]
    fn test_unnamed_index_column() {
        let data = ",logFC,pvalue\nGene_0,1.0,0.5\nGene_1,2.0,0.01\n";
        let table = table_from_reader(data.as_bytes(), b',').unwrap();
        assert_eq!(table.records()[0].id, "Gene_0");
        assert_eq!(table.records()[1].id, "Gene_1");
    }

    #[test]
    fn test_duplicate_ids_fail() {
        let data = "gene,logFC,pvalue\ng1,1.0,0.5\ng1,2.0,0.01\n";
        let err = table_from_reader(data.as_bytes(), b',').unwrap_err();
        assert!(matches!(err, AtoError::Schema(_)));
    }
}
