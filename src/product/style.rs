//! Display styles carried by records and consumed by the renderers.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Line style for traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Pen {
    pub color: String,
    pub size: f64,
    pub alpha: f64,
    pub zorder: f64,
    pub label: Option<String>,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            color: "black".to_string(),
            size: 1.0,
            alpha: 1.0,
            zorder: 0.0,
            label: None,
        }
    }
}

/// Symbol style for scattered points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Marker {
    pub color: String,
    pub size: f64,
    pub alpha: f64,
    pub zorder: f64,
    pub label: Option<String>,
    pub symbol: String,
}

impl Default for Marker {
    fn default() -> Self {
        Self {
            color: "black".to_string(),
            size: 5.0,
            alpha: 1.0,
            zorder: 0.0,
            label: None,
            symbol: ".".to_string(),
        }
    }
}

impl Marker {
    pub fn from_pen(pen: &Pen, symbol: &str) -> Self {
        Self {
            color: pen.color.clone(),
            size: pen.size,
            alpha: pen.alpha,
            zorder: pen.zorder,
            label: pen.label.clone(),
            symbol: symbol.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistogramStyle {
    pub color: String,
    pub label: Option<String>,
    pub alpha_edge: f64,
    pub alpha_face: f64,
    pub linewidth: f64,
}

impl Default for HistogramStyle {
    fn default() -> Self {
        Self {
            color: "black".to_string(),
            label: None,
            alpha_edge: 1.0,
            alpha_face: 0.3,
            linewidth: 2.0,
        }
    }
}

/// Figure titles, axis labels and axis limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Format2D {
    pub title_fig: Option<String>,
    pub title_legend: Option<String>,
    pub title_ax: Option<String>,
    pub label_x: Option<String>,
    pub label_y: Option<String>,
    pub lim_x_min: Option<f64>,
    pub lim_x_max: Option<f64>,
    pub lim_y_min: Option<f64>,
    pub lim_y_max: Option<f64>,
}

impl Format2D {
    /// Merge the formats of every record drawn on one figure.
    ///
    /// Text fields keep the first value seen; a later, different value is
    /// logged and ignored. Limits widen to cover every format.
    pub fn union<'a, I>(formats: I) -> Self
    where
        I: IntoIterator<Item = &'a Format2D>,
    {
        let mut out = Format2D::default();
        for f in formats {
            merge_text("title_fig", &mut out.title_fig, &f.title_fig);
            merge_text("title_legend", &mut out.title_legend, &f.title_legend);
            merge_text("title_ax", &mut out.title_ax, &f.title_ax);
            merge_text("label_x", &mut out.label_x, &f.label_x);
            merge_text("label_y", &mut out.label_y, &f.label_y);
            out.lim_x_min = widen(out.lim_x_min, f.lim_x_min, f64::min);
            out.lim_x_max = widen(out.lim_x_max, f.lim_x_max, f64::max);
            out.lim_y_min = widen(out.lim_y_min, f.lim_y_min, f64::min);
            out.lim_y_max = widen(out.lim_y_max, f.lim_y_max, f64::max);
        }
        out
    }
}

fn merge_text(field: &str, into: &mut Option<String>, from: &Option<String>) {
    match (into.as_ref(), from) {
        (None, Some(v)) => *into = Some(v.clone()),
        (Some(have), Some(v)) if have != v => {
            warn!(field, kept = %have, ignored = %v, "conflicting figure format");
        }
        _ => {}
    }
}

fn widen(a: Option<f64>, b: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(pick(x, y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn union_widens_limits_and_keeps_first_title() {
        let a = Format2D {
            title_fig: Some("waves".into()),
            lim_x_min: Some(0.0),
            lim_x_max: Some(1.0),
            ..Default::default()
        };
        let b = Format2D {
            title_fig: Some("other".into()),
            label_x: Some("t".into()),
            lim_x_min: Some(-2.0),
            lim_y_max: Some(5.0),
            ..Default::default()
        };
        let merged = Format2D::union([&a, &b]);
        assert_eq!(merged.title_fig.as_deref(), Some("waves"));
        assert_eq!(merged.label_x.as_deref(), Some("t"));
        assert_eq!(merged.lim_x_min, Some(-2.0));
        assert_eq!(merged.lim_x_max, Some(1.0));
        assert_eq!(merged.lim_y_min, None);
        assert_eq!(merged.lim_y_max, Some(5.0));
    }

    #[test]
    fn marker_from_pen_copies_label() {
        let pen = Pen {
            color: "blue".into(),
            label: Some("wave1".into()),
            ..Default::default()
        };
        let marker = Marker::from_pen(&pen, "o");
        assert_eq!(marker.color, "blue");
        assert_eq!(marker.label.as_deref(), Some("wave1"));
        assert_eq!(marker.symbol, "o");
    }
}
