//! Dashboard definition: one JSON panel per tag and kind family, plus a
//! dashboard listing them all. Panel targets point at the served products
//! tree, `{base_url}/{dotted tag}/{Kind}`.

use crate::Result;
use crate::aggregate::{TagCollection, claim_output};
use crate::config::Endpoint;
use crate::product::RecordKind;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DATASOURCE: &str = "yesoreyeram-infinity-datasource";

const QUERY_TABLE: &str = r#"parse-json
| project "elements"
| project "row", "col", "value", "unit", "metadata""#;

const QUERY_POINTS: &str = r#"parse-json
| project "elements"
| extend "label"="marker.label""#;

const QUERY_TRACES: &str = r#"parse-json
| project "elements"
| extend "label"="pen.label"
| mv-expand "points"
| extend "x"="points.x", "y"="points.y"
| project "label", "x", "y", "metadata""#;

const QUERY_HISTOGRAM: &str = r#"parse-json
| project "elements"
| extend "label"="style.label"
| project "label", "value""#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub datasource: DataSource,
    pub ref_id: String,
    pub url: String,
    pub uql: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    pub id: String,
    pub options: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub targets: Vec<Target>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformations: Vec<Transformation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub title: String,
    pub panels: Vec<Panel>,
}

fn target(endpoint: &Endpoint, dotted: &str, kind: RecordKind, ref_id: &str, uql: &str) -> Target {
    Target {
        datasource: DataSource {
            kind: DATASOURCE.to_string(),
        },
        ref_id: ref_id.to_string(),
        url: format!("{}/{}/{}", endpoint.base_url(), dotted, kind),
        uql: uql.to_string(),
    }
}

/// Panels for one collection, paired with their file stem.
pub fn panels_for(collection: &TagCollection, endpoint: &Endpoint) -> Vec<(String, Panel)> {
    let dotted = collection.tag.dotted();
    let stem = collection.tag.underscored();
    let mut out = Vec::new();

    if !collection.table_entries().is_empty() {
        out.push((
            format!("{stem}_table_panel"),
            Panel {
                title: dotted.clone(),
                kind: "table".to_string(),
                targets: vec![target(endpoint, &dotted, RecordKind::TableEntry, "A", QUERY_TABLE)],
                transformations: Vec::new(),
            },
        ));
    }

    if !collection.points().is_empty() || !collection.traces().is_empty() {
        out.push((
            format!("{stem}_xy_panel"),
            Panel {
                title: dotted.clone(),
                kind: "xychart".to_string(),
                targets: vec![
                    target(endpoint, &dotted, RecordKind::Point2D, "A", QUERY_POINTS),
                    target(endpoint, &dotted, RecordKind::Trace2D, "B", QUERY_TRACES),
                ],
                transformations: vec![
                    Transformation {
                        id: "merge".to_string(),
                        options: serde_json::json!({}),
                    },
                    Transformation {
                        id: "partitionByValues".to_string(),
                        options: serde_json::json!({
                            "fields": ["label"],
                            "keepFields": false,
                            "naming": { "asLabels": false },
                        }),
                    },
                ],
            },
        ));
    }

    if !collection.histogram_entries().is_empty() {
        out.push((
            format!("{stem}_histogram_panel"),
            Panel {
                kind: "histogram".to_string(),
                targets: vec![target(
                    endpoint,
                    &dotted,
                    RecordKind::HistogramEntry,
                    "A",
                    QUERY_HISTOGRAM,
                )],
                title: dotted,
                transformations: Vec::new(),
            },
        ));
    }
    out
}

/// Write `panels/*.json` and `dashboard.json` under `dashboard_dir`.
///
/// Panels in the dashboard follow collection order. Nothing is written when
/// two tags share a panel file name or a target URL.
pub fn write_dashboard(
    collections: &[TagCollection],
    dashboard_dir: &Path,
    endpoint: &Endpoint,
) -> Result<Vec<PathBuf>> {
    let panel_dir = dashboard_dir.join("panels");

    let mut files = BTreeMap::new();
    let mut urls = BTreeMap::new();
    let mut planned = Vec::new();
    for collection in collections {
        claim_output(&mut urls, PathBuf::from(collection.tag.dotted()), &collection.tag)?;
        for (stem, panel) in panels_for(collection, endpoint) {
            let path = panel_dir.join(format!("{stem}.json"));
            claim_output(&mut files, path.clone(), &collection.tag)?;
            planned.push((path, panel));
        }
    }

    if panel_dir.exists() {
        fs::remove_dir_all(&panel_dir)
            .with_context(|| format!("remove stale panels in {}", panel_dir.display()))?;
    }
    fs::create_dir_all(&panel_dir).with_context(|| format!("create {}", panel_dir.display()))?;

    let mut written = Vec::new();
    let mut panels = Vec::new();
    for (path, panel) in planned {
        fs::write(&path, serde_json::to_string_pretty(&panel)?)
            .with_context(|| format!("write {}", path.display()))?;
        written.push(path);
        panels.push(panel);
    }

    let dashboard = Dashboard {
        title: "trendify".to_string(),
        panels,
    };
    let path = dashboard_dir.join("dashboard.json");
    fs::write(&path, serde_json::to_string_pretty(&dashboard)?)
        .with_context(|| format!("write {}", path.display()))?;
    written.push(path);
    Ok(written)
}
