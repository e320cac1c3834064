//! SVG figures for xy data and histograms.

use crate::product::{Format2D, HistogramEntry, HistogramStyle, Marker, Point2D, Trace2D};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureConfig {
    pub width: u32,
    pub height: u32,
    pub bins: usize,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 400,
            bins: 16,
        }
    }
}

const MARGIN: f64 = 48.0;
const LEGEND_ROW: f64 = 16.0;

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Plot area mapping from data space to pixel space.
struct Frame {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    width: f64,
    height: f64,
}

impl Frame {
    fn new(xs: &[f64], ys: &[f64], format: &Format2D, config: &FigureConfig) -> Self {
        let bounds = |vals: &[f64], lo: Option<f64>, hi: Option<f64>| {
            let min = lo.unwrap_or_else(|| vals.iter().copied().fold(f64::INFINITY, f64::min));
            let max = hi.unwrap_or_else(|| vals.iter().copied().fold(f64::NEG_INFINITY, f64::max));
            match (min.is_finite(), max.is_finite()) {
                (true, true) if max > min => (min, max),
                (true, true) => (min - 0.5, max + 0.5),
                _ => (0.0, 1.0),
            }
        };
        let (x0, x1) = bounds(xs, format.lim_x_min, format.lim_x_max);
        let (y0, y1) = bounds(ys, format.lim_y_min, format.lim_y_max);
        Self {
            x0,
            x1,
            y0,
            y1,
            width: config.width as f64,
            height: config.height as f64,
        }
    }

    fn px(&self, x: f64) -> f64 {
        MARGIN + (x - self.x0) / (self.x1 - self.x0) * (self.width - 2.0 * MARGIN)
    }

    fn py(&self, y: f64) -> f64 {
        self.height - MARGIN - (y - self.y0) / (self.y1 - self.y0) * (self.height - 2.0 * MARGIN)
    }
}

fn open(config: &FigureConfig) -> Vec<String> {
    vec![format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='{w}' height='{h}' font-family='sans-serif' font-size='12'>",
        w = config.width,
        h = config.height
    )]
}

fn decorate(parts: &mut Vec<String>, format: &Format2D, config: &FigureConfig) {
    let (w, h) = (config.width as f64, config.height as f64);
    parts.push(format!(
        "<rect x='{m}' y='{m}' width='{:.2}' height='{:.2}' fill='none' stroke='#888' />",
        w - 2.0 * MARGIN,
        h - 2.0 * MARGIN,
        m = MARGIN
    ));
    let title = [&format.title_fig, &format.title_ax]
        .into_iter()
        .flatten()
        .map(|s| escape(s))
        .collect::<Vec<_>>()
        .join(" / ");
    if !title.is_empty() {
        parts.push(format!(
            "<text x='{:.2}' y='20' text-anchor='middle' font-size='14'>{}</text>",
            w / 2.0,
            title
        ));
    }
    if let Some(label) = &format.label_x {
        parts.push(format!(
            "<text x='{:.2}' y='{:.2}' text-anchor='middle'>{}</text>",
            w / 2.0,
            h - 12.0,
            escape(label)
        ));
    }
    if let Some(label) = &format.label_y {
        parts.push(format!(
            "<text x='14' y='{:.2}' text-anchor='middle' transform='rotate(-90 14 {:.2})'>{}</text>",
            h / 2.0,
            h / 2.0,
            escape(label)
        ));
    }
}

fn legend(
    parts: &mut Vec<String>,
    entries: &[(String, String)],
    title: Option<&str>,
    config: &FigureConfig,
) {
    if entries.is_empty() {
        return;
    }
    let x = config.width as f64 - MARGIN - 110.0;
    let mut y = MARGIN + LEGEND_ROW;
    if let Some(t) = title {
        parts.push(format!(
            "<text x='{:.2}' y='{:.2}' font-weight='bold'>{}</text>",
            x,
            y,
            escape(t)
        ));
        y += LEGEND_ROW;
    }
    for (label, color) in entries {
        parts.push(format!(
            "<rect x='{:.2}' y='{:.2}' width='10' height='10' fill='{}' />",
            x,
            y - 10.0,
            escape(color)
        ));
        parts.push(format!("<text x='{:.2}' y='{:.2}'>{}</text>", x + 14.0, y, escape(label)));
        y += LEGEND_ROW;
    }
}

/// Push `(label, color)` unless the label is already listed.
fn add_legend_entry(entries: &mut Vec<(String, String)>, label: &Option<String>, color: &str) {
    if let Some(label) = label {
        if !entries.iter().any(|(l, _)| l == label) {
            entries.push((label.clone(), color.to_string()));
        }
    }
}

/// Scatter the points (grouped by marker) and draw every trace on one figure.
pub fn render_xy_svg(points: &[&Point2D], traces: &[&Trace2D], config: &FigureConfig) -> String {
    let formats: Vec<&Format2D> = points
        .iter()
        .filter_map(|p| p.format2d.as_ref())
        .chain(traces.iter().map(|t| &t.format2d))
        .collect();
    let format = Format2D::union(formats);

    let mut xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let mut ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    for t in traces {
        xs.extend(t.points.iter().map(|p| p.x));
        ys.extend(t.points.iter().map(|p| p.y));
    }
    let frame = Frame::new(&xs, &ys, &format, config);

    let mut parts = open(config);
    decorate(&mut parts, &format, config);
    let mut entries = Vec::new();

    let mut sorted_traces: Vec<&&Trace2D> = traces.iter().collect();
    sorted_traces.sort_by(|a, b| a.pen.zorder.total_cmp(&b.pen.zorder));
    for t in sorted_traces {
        let coords = t
            .points
            .iter()
            .map(|p| format!("{:.2},{:.2}", frame.px(p.x), frame.py(p.y)))
            .collect::<Vec<_>>()
            .join(" ");
        parts.push(format!(
            "<polyline points='{}' fill='none' stroke='{}' stroke-width='{}' stroke-opacity='{}' />",
            coords,
            escape(&t.pen.color),
            t.pen.size,
            t.pen.alpha
        ));
        add_legend_entry(&mut entries, &t.pen.label, &t.pen.color);
    }

    let default_marker = Marker::default();
    let mut groups: Vec<(&Marker, Vec<&Point2D>)> = Vec::new();
    for &p in points {
        let marker = p.marker.as_ref().unwrap_or(&default_marker);
        match groups.iter_mut().find(|(m, _)| *m == marker) {
            Some((_, members)) => members.push(p),
            None => groups.push((marker, vec![p])),
        }
    }
    for (marker, members) in groups {
        for p in members {
            parts.push(format!(
                "<circle cx='{:.2}' cy='{:.2}' r='{:.2}' fill='{}' fill-opacity='{}' />",
                frame.px(p.x),
                frame.py(p.y),
                (marker.size.max(1.0)).sqrt() * 1.5,
                escape(&marker.color),
                marker.alpha
            ));
        }
        add_legend_entry(&mut entries, &marker.label, &marker.color);
    }

    legend(&mut parts, &entries, format.title_legend.as_deref(), config);
    parts.push("</svg>".into());
    parts.join("")
}

/// Histogram of the entry values, one bar series per distinct style, all
/// sharing the same bins.
pub fn render_histogram_svg(entries: &[&HistogramEntry], config: &FigureConfig) -> String {
    let format = Format2D::union(entries.iter().map(|e| &e.format2d));
    let values: Vec<f64> = entries.iter().map(|e| e.value).collect();
    let mut parts = open(config);
    decorate(&mut parts, &format, config);
    if values.is_empty() {
        parts.push("</svg>".into());
        return parts.join("");
    }

    let min = format
        .lim_x_min
        .unwrap_or_else(|| values.iter().copied().fold(f64::INFINITY, f64::min));
    let max = format
        .lim_x_max
        .unwrap_or_else(|| values.iter().copied().fold(f64::NEG_INFINITY, f64::max));
    let bin_count = config.bins.max(1);
    let span = (max - min).max(1e-9);
    let bin_of = |v: f64| {
        let idx = ((v - min) / span * bin_count as f64).floor().max(0.0) as usize;
        idx.min(bin_count - 1)
    };

    let mut series: Vec<(&HistogramStyle, Vec<usize>)> = Vec::new();
    for e in entries {
        let idx = match series.iter().position(|(s, _)| **s == e.style) {
            Some(i) => i,
            None => {
                series.push((&e.style, vec![0; bin_count]));
                series.len() - 1
            }
        };
        series[idx].1[bin_of(e.value)] += 1;
    }

    let max_bin = series
        .iter()
        .flat_map(|(_, bins)| bins.iter().copied())
        .max()
        .unwrap_or(1)
        .max(1) as f64;
    let plot_w = config.width as f64 - 2.0 * MARGIN;
    let plot_h = config.height as f64 - 2.0 * MARGIN;
    let bar_width = plot_w / bin_count as f64;

    let mut legend_entries = Vec::new();
    for (style, bins) in &series {
        for (idx, count) in bins.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            let height = (*count as f64 / max_bin) * plot_h;
            parts.push(format!(
                "<rect x='{:.2}' y='{:.2}' width='{:.2}' height='{:.2}' fill='{c}' fill-opacity='{}' stroke='{c}' stroke-opacity='{}' stroke-width='{}' />",
                MARGIN + bar_width * idx as f64,
                MARGIN + plot_h - height,
                bar_width.max(1.0),
                height,
                style.alpha_face,
                style.alpha_edge,
                style.linewidth,
                c = escape(&style.color),
            ));
        }
        add_legend_entry(&mut legend_entries, &style.label, &style.color);
    }

    legend(&mut parts, &legend_entries, format.title_legend.as_deref(), config);
    parts.push("</svg>".into());
    parts.join("")
}
