//! Record model: tags, styles and the record sum type.

pub mod record;
pub mod style;
pub mod tag;

pub use record::{
    CellValue, HistogramEntry, Label, Metadata, Point2D, Record, RecordKind, TableEntry, Trace2D,
    XY,
};
pub use style::{Format2D, HistogramStyle, Marker, Pen};
pub use tag::{Tag, TagAtom};
