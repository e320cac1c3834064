//! Compiled-in generators addressed by module path.

use crate::Result;
use crate::generate::ProductGenerator;
use crate::product::{
    CellValue, Format2D, HistogramEntry, HistogramStyle, Label, Marker, Pen, Point2D, Record,
    TableEntry, Tag, Trace2D,
};
use crate::sample::RESULTS_FNAME;

use anyhow::{Context, bail};
use std::path::Path;

pub type GeneratorFn = fn(&Path) -> Result<Vec<Record>>;

/// (module, qualifier, function)
const REGISTRY: &[(&str, &str, GeneratorFn)] = &[
    (
        "trendify.examples",
        "example_data_product_generator",
        example_data_product_generator,
    ),
    (
        "trendify.examples",
        "ExampleGenerator.generate",
        example_data_product_generator,
    ),
];

#[derive(Clone)]
pub struct BuiltinGenerator {
    name: String,
    func: GeneratorFn,
}

impl BuiltinGenerator {
    /// Find `module:qualifier`. Without a qualifier the module's first
    /// registered generator is used.
    pub fn lookup(module: &str, qualifier: Option<&str>) -> std::result::Result<Self, String> {
        let candidates: Vec<&(&str, &str, GeneratorFn)> =
            REGISTRY.iter().filter(|(m, _, _)| *m == module).collect();
        if candidates.is_empty() {
            return Err(format!("no module named {}", module));
        }

        let found = match qualifier {
            Some(q) => *candidates
                .iter()
                .find(|(_, name, _)| *name == q)
                .ok_or_else(|| format!("module {} has no generator {}", module, q))?,
            // The first registered generator is the module's default.
            None => candidates[0],
        };

        Ok(Self {
            name: format!("{}:{}", found.0, found.1),
            func: found.2,
        })
    }
}

impl ProductGenerator for BuiltinGenerator {
    fn generate(&self, dir: &Path) -> Result<Vec<Record>> {
        (self.func)(dir)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

const PALETTE: [&str; 4] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728"];

/// Reads `results.csv` (a `time` column plus value columns) and emits a trace
/// per column, one point per trace (its length), one table cell per column
/// (its length) and one histogram entry per column (its mean).
pub fn example_data_product_generator(dir: &Path) -> Result<Vec<Record>> {
    let path = dir.join(RESULTS_FNAME);
    let mut reader =
        csv::Reader::from_path(&path).with_context(|| format!("open {}", path.display()))?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.first().map(String::as_str) != Some("time") {
        bail!("{}: first column must be 'time'", path.display());
    }

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
    for (lineno, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("read {}:{}", path.display(), lineno + 2))?;
        for (col, field) in columns.iter_mut().zip(row.iter()) {
            col.push(field.trim().parse::<f64>().with_context(|| {
                format!("bad number {:?} at {}:{}", field, path.display(), lineno + 2)
            })?);
        }
    }

    let run = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let row_label = run
        .parse::<i64>()
        .map(Label::Int)
        .unwrap_or_else(|_| Label::Text(run.clone()));

    let mut products = Vec::new();
    let time = &columns[0];
    for (i, (name, values)) in headers.iter().zip(&columns).enumerate().skip(1) {
        let color = PALETTE[(i - 1) % PALETTE.len()].to_string();
        let pen = Pen {
            color: color.clone(),
            label: Some(name.clone()),
            ..Default::default()
        };

        products.push(Record::Trace2D(Trace2D::from_xy(
            vec![Tag::from("trace_plot")],
            time,
            values,
            pen.clone(),
            Format2D {
                title_legend: Some("Column".into()),
                label_x: Some("time".into()),
                ..Default::default()
            },
        )));

        if let Ok(x) = run.parse::<f64>() {
            products.push(Record::Point2D(Point2D {
                marker: Some(Marker {
                    size: 10.0,
                    ..Marker::from_pen(&pen, "o")
                }),
                format2d: Some(Format2D {
                    title_fig: Some("N Points".into()),
                    ..Default::default()
                }),
                ..Point2D::new(vec![Tag::from("scatter_plot")], x, values.len() as f64)
            }));
        }

        products.push(Record::TableEntry(TableEntry::new(
            vec![Tag::from("table")],
            row_label.clone(),
            Label::Text(name.clone()),
            CellValue::Number(values.len() as f64),
        )));

        let mean = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };
        products.push(Record::HistogramEntry(HistogramEntry {
            style: HistogramStyle {
                color,
                label: Some(name.clone()),
                alpha_face: 1.0,
                ..Default::default()
            },
            format2d: Format2D {
                title_fig: Some("Column means".into()),
                label_x: Some("Series value".into()),
                label_y: Some("Counts".into()),
                ..Default::default()
            },
            ..HistogramEntry::new(vec![Tag::from("histogram")], mean)
        }));
    }

    Ok(products)
}
