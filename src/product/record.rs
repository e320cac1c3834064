//! The record sum type and its four kinds.
//!
//! JSON shape (one element of a data products artifact):
//! {
//!   "kind": "TableEntry",
//!   "tags": [["tables", "summary"]],
//!   "metadata": {},
//!   "row": "run0", "col": "wave1", "value": 42, "unit": null
//! }

use crate::product::style::{Format2D, HistogramStyle, Marker, Pen};
use crate::product::tag::Tag;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type Metadata = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Record {
    HistogramEntry(HistogramEntry),
    Point2D(Point2D),
    Trace2D(Trace2D),
    TableEntry(TableEntry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    HistogramEntry,
    Point2D,
    Trace2D,
    TableEntry,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::HistogramEntry => "HistogramEntry",
            RecordKind::Point2D => "Point2D",
            RecordKind::Trace2D => "Trace2D",
            RecordKind::TableEntry => "TableEntry",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::HistogramEntry(_) => RecordKind::HistogramEntry,
            Record::Point2D(_) => RecordKind::Point2D,
            Record::Trace2D(_) => RecordKind::Trace2D,
            Record::TableEntry(_) => RecordKind::TableEntry,
        }
    }

    pub fn tags(&self) -> &[Tag] {
        match self {
            Record::HistogramEntry(r) => &r.tags,
            Record::Point2D(r) => &r.tags,
            Record::Trace2D(r) => &r.tags,
            Record::TableEntry(r) => &r.tags,
        }
    }

    /// Name of the first numeric field that is NaN or infinite.
    ///
    /// JSON has no encoding for such values, so a record carrying one cannot
    /// be persisted and read back.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        let bad = |v: f64| !v.is_finite();
        match self {
            Record::HistogramEntry(h) => bad(h.value).then_some("value"),
            Record::Point2D(p) => {
                if bad(p.x) {
                    Some("x")
                } else if bad(p.y) {
                    Some("y")
                } else {
                    None
                }
            }
            Record::Trace2D(t) => t
                .points
                .iter()
                .find_map(|p| (bad(p.x) || bad(p.y)).then_some("points")),
            Record::TableEntry(e) => match e.value {
                CellValue::Number(n) if bad(n) => Some("value"),
                _ => None,
            },
        }
    }
}

/// One value binned into a tag-scoped histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramEntry {
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub metadata: Metadata,
    pub value: f64,
    #[serde(default)]
    pub style: HistogramStyle,
    #[serde(default)]
    pub format2d: Format2D,
}

impl HistogramEntry {
    pub fn new(tags: Vec<Tag>, value: f64) -> Self {
        Self {
            tags,
            metadata: Metadata::new(),
            value,
            style: HistogramStyle::default(),
            format2d: Format2D::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub metadata: Metadata,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub marker: Option<Marker>,
    #[serde(default)]
    pub format2d: Option<Format2D>,
}

impl Point2D {
    pub fn new(tags: Vec<Tag>, x: f64, y: f64) -> Self {
        Self {
            tags,
            metadata: Metadata::new(),
            x,
            y,
            marker: Some(Marker::default()),
            format2d: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XY {
    pub x: f64,
    pub y: f64,
}

/// Ordered points drawn as one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace2D {
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub metadata: Metadata,
    pub points: Vec<XY>,
    #[serde(default)]
    pub pen: Pen,
    #[serde(default)]
    pub format2d: Format2D,
}

impl Trace2D {
    /// Zip `xs` and `ys` into a trace; the shorter side bounds the length.
    pub fn from_xy(tags: Vec<Tag>, xs: &[f64], ys: &[f64], pen: Pen, format2d: Format2D) -> Self {
        Self {
            tags,
            metadata: Metadata::new(),
            points: xs.iter().zip(ys).map(|(&x, &y)| XY { x, y }).collect(),
            pen,
            format2d,
        }
    }
}

/// Row or column key of a table cell.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Int(i64),
    Text(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(i) => write!(f, "{}", i),
            Label::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Text(s.to_string())
    }
}

impl From<i64> for Label {
    fn from(i: i64) -> Self {
        Label::Int(i)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// One (row, col) cell of a tag-scoped table.
///
/// Uniqueness of (row, col) within a tag is only checked when pivoting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub metadata: Metadata,
    pub row: Label,
    pub col: Label,
    pub value: CellValue,
    #[serde(default)]
    pub unit: Option<String>,
}

impl TableEntry {
    pub fn new(tags: Vec<Tag>, row: Label, col: Label, value: CellValue) -> Self {
        Self {
            tags,
            metadata: Metadata::new(),
            row,
            col,
            value,
            unit: None,
        }
    }
}
