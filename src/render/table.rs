//! Table rendering: melted, pivot and stats CSV files for one tag.

use crate::Result;
use crate::error::TrendifyError;
use crate::product::{CellValue, Label, TableEntry, Tag};

use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Wide form of a set of table entries: one cell per (row, col).
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub rows: Vec<Label>,
    pub cols: Vec<Label>,
    cells: BTreeMap<(Label, Label), CellValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub name: Label,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    /// Three sample standard deviations.
    pub sigma3: Option<f64>,
}

impl Pivot {
    /// Pivot on (row, col). Rows and columns come out sorted by key.
    pub fn from_entries(
        tag: &Tag,
        entries: &[&TableEntry],
    ) -> std::result::Result<Self, TrendifyError> {
        let mut cells = BTreeMap::new();
        let mut rows = BTreeSet::new();
        let mut cols = BTreeSet::new();
        for e in entries {
            let key = (e.row.clone(), e.col.clone());
            if cells.insert(key, e.value.clone()).is_some() {
                return Err(TrendifyError::DuplicateCell {
                    tag: tag.clone(),
                    row: e.row.clone(),
                    col: e.col.clone(),
                });
            }
            rows.insert(e.row.clone());
            cols.insert(e.col.clone());
        }
        Ok(Self {
            rows: rows.into_iter().collect(),
            cols: cols.into_iter().collect(),
            cells,
        })
    }

    pub fn get(&self, row: &Label, col: &Label) -> Option<&CellValue> {
        self.cells.get(&(row.clone(), col.clone()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Statistics over the numeric cells of each column.
    pub fn column_stats(&self) -> Vec<ColumnStats> {
        self.cols
            .iter()
            .map(|col| {
                let values: Vec<f64> = self
                    .rows
                    .iter()
                    .filter_map(|row| self.get(row, col).and_then(CellValue::as_f64))
                    .collect();
                let n = values.len();
                let mean = (n > 0).then(|| values.iter().sum::<f64>() / n as f64);
                let sigma3 = mean.filter(|_| n > 1).map(|m| {
                    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
                    3.0 * var.sqrt()
                });
                ColumnStats {
                    name: col.clone(),
                    min: values.iter().copied().reduce(f64::min),
                    max: values.iter().copied().reduce(f64::max),
                    mean,
                    sigma3,
                }
            })
            .collect()
    }
}

fn opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// Write `<base>_melted.csv`, `<base>_pivot.csv` and `<base>_stats.csv`.
///
/// The pivot is built first, so a duplicate cell writes nothing.
pub fn write_tables(tag: &Tag, entries: &[&TableEntry], base: &Path) -> Result<Vec<PathBuf>> {
    let pivot = Pivot::from_entries(tag, entries)?;
    let melted_path = super::sibling(base, "_melted.csv");
    let pivot_path = super::sibling(base, "_pivot.csv");
    let stats_path = super::sibling(base, "_stats.csv");
    if let Some(parent) = base.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }

    let mut w = csv::Writer::from_path(&melted_path)
        .with_context(|| format!("create {}", melted_path.display()))?;
    w.write_record(["row", "col", "value", "unit"])?;
    for e in entries {
        w.write_record([
            e.row.to_string(),
            e.col.to_string(),
            e.value.to_string(),
            e.unit.clone().unwrap_or_default(),
        ])?;
    }
    w.flush()?;

    let mut w = csv::Writer::from_path(&pivot_path)
        .with_context(|| format!("create {}", pivot_path.display()))?;
    let mut header = vec!["row".to_string()];
    header.extend(pivot.cols.iter().map(|c| c.to_string()));
    w.write_record(&header)?;
    for row in &pivot.rows {
        let mut line = vec![row.to_string()];
        line.extend(
            pivot
                .cols
                .iter()
                .map(|col| pivot.get(row, col).map(|v| v.to_string()).unwrap_or_default()),
        );
        w.write_record(&line)?;
    }
    w.flush()?;

    let mut w = csv::Writer::from_path(&stats_path)
        .with_context(|| format!("create {}", stats_path.display()))?;
    w.write_record(["Name", "min", "max", "mean", "sigma3"])?;
    for s in pivot.column_stats() {
        w.write_record([s.name.to_string(), opt(s.min), opt(s.max), opt(s.mean), opt(s.sigma3)])?;
    }
    w.flush()?;

    Ok(vec![melted_path, pivot_path, stats_path])
}
