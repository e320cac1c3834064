//! Asset passes over the aggregated products tree.
//!
//! Static assets (CSV tables, SVG figures, `include.md` files) land under the
//! static directory at each collection's tag path. Interactive assets are a
//! dashboard definition and an HTML viewer.

pub mod dashboard;
pub mod html;
pub mod include;
pub mod svg;
pub mod table;

use crate::Result;
use crate::aggregate::{TagCollection, claim_output, load_collections};
use crate::config::{Endpoint, FailurePolicy, Workers};
use crate::error::TrendifyError;
use crate::pool::run_units;
use crate::product::Tag;
use include::IncludeOptions;
use svg::FigureConfig;

use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// `base` with `suffix` appended to its final component.
pub(crate) fn sibling(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    base.with_file_name(name)
}

/// Which static assets to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticOptions {
    pub tables: bool,
    pub xy_plots: bool,
    pub histograms: bool,
    pub figure: FigureConfig,
    /// Write `include.md` files over the finished tree.
    pub includes: Option<IncludeOptions>,
}

impl Default for StaticOptions {
    fn default() -> Self {
        Self {
            tables: true,
            xy_plots: true,
            histograms: true,
            figure: FigureConfig::default(),
            includes: Some(IncludeOptions::default()),
        }
    }
}

/// Files one collection renders to; `None` where the collection has no
/// records of that family or the family is switched off.
struct AssetPlan<'a> {
    collection: &'a TagCollection,
    tables: Option<PathBuf>,
    xy: Option<PathBuf>,
    hist: Option<PathBuf>,
}

impl<'a> AssetPlan<'a> {
    fn new(
        collection: &'a TagCollection,
        static_dir: &Path,
        opts: &StaticOptions,
    ) -> Result<Self> {
        let base = static_dir.join(collection.tag.relative_path()?);
        let has_xy = !collection.points().is_empty() || !collection.traces().is_empty();
        Ok(Self {
            collection,
            tables: (opts.tables && !collection.table_entries().is_empty()).then(|| base.clone()),
            xy: (opts.xy_plots && has_xy).then(|| sibling(&base, ".svg")),
            hist: (opts.histograms && !collection.histogram_entries().is_empty())
                .then(|| sibling(&base, "_hist.svg")),
        })
    }

    fn files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Some(base) = &self.tables {
            files.extend(TABLE_SUFFIXES.iter().map(|s| sibling(base, s)));
        }
        files.extend(self.xy.iter().cloned());
        files.extend(self.hist.iter().cloned());
        files
    }
}

const TABLE_SUFFIXES: [&str; 3] = ["_melted.csv", "_pivot.csv", "_stats.csv"];

/// Fail when two collections would write the same file, or when one
/// collection's file sits where another needs a directory.
fn check_disjoint(plans: &[AssetPlan<'_>]) -> Result<()> {
    let mut owners: BTreeMap<PathBuf, Tag> = BTreeMap::new();
    for plan in plans {
        for file in plan.files() {
            claim_output(&mut owners, file, &plan.collection.tag)?;
        }
    }
    for (file, tag) in &owners {
        for dir in file.ancestors().skip(1) {
            if let Some(first) = owners.get(dir) {
                return Err(TrendifyError::TagPathCollision {
                    first: first.clone(),
                    second: tag.clone(),
                    path: dir.to_path_buf(),
                }
                .into());
            }
        }
    }
    Ok(())
}

fn write_svg(path: &Path, svg: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, svg).with_context(|| format!("write {}", path.display()))
}

fn render_collection(plan: &AssetPlan<'_>, opts: &StaticOptions) -> Result<Vec<PathBuf>> {
    let collection = plan.collection;
    let mut written = Vec::new();

    if let Some(base) = &plan.tables {
        let entries = collection.table_entries();
        written.extend(table::write_tables(&collection.tag, &entries, base)?);
    }
    if let Some(path) = &plan.xy {
        let svg = svg::render_xy_svg(&collection.points(), &collection.traces(), &opts.figure);
        write_svg(path, &svg)?;
        written.push(path.clone());
    }
    if let Some(path) = &plan.hist {
        let svg = svg::render_histogram_svg(&collection.histogram_entries(), &opts.figure);
        write_svg(path, &svg)?;
        written.push(path.clone());
    }

    debug!(tag = %collection.tag, files = written.len(), "rendered collection");
    Ok(written)
}

/// Render tables and figures for every collection under `products_dir`.
///
/// The static directory is rebuilt from scratch. Collections are
/// independent, so they are spread over `workers`; files are returned in
/// collection order, followed by the include files when enabled.
pub fn make_tables_and_figures(
    products_dir: &Path,
    static_dir: &Path,
    workers: Workers,
    opts: &StaticOptions,
) -> Result<Vec<PathBuf>> {
    let collections = load_collections(products_dir)?;
    info!(
        collections = collections.len(),
        out = %static_dir.display(),
        "making static assets"
    );
    let plans = collections
        .iter()
        .map(|c| AssetPlan::new(c, static_dir, opts))
        .collect::<Result<Vec<_>>>()?;
    check_disjoint(&plans)?;

    if static_dir.exists() {
        fs::remove_dir_all(static_dir)
            .with_context(|| format!("remove stale assets in {}", static_dir.display()))?;
    }
    fs::create_dir_all(static_dir).with_context(|| format!("create {}", static_dir.display()))?;

    let per_collection = run_units(
        &plans,
        workers,
        FailurePolicy::Abort,
        |plan| static_dir.join(plan.collection.tag.underscored()),
        |plan| render_collection(plan, opts),
    )?;
    let mut files: Vec<PathBuf> = per_collection.into_iter().flatten().collect();
    if let Some(include_opts) = &opts.includes {
        files.extend(include::write_include_files(static_dir, include_opts)?);
    }
    info!(files = files.len(), "finished static assets");
    Ok(files)
}

/// Write the dashboard definition under `dashboard_dir` and the HTML viewer
/// at `index_path`, linking to assets found in `static_dir`.
pub fn make_interactive(
    products_dir: &Path,
    dashboard_dir: &Path,
    index_path: &Path,
    static_dir: &Path,
    endpoint: &Endpoint,
) -> Result<Vec<PathBuf>> {
    let collections = load_collections(products_dir)?;
    info!(
        collections = collections.len(),
        url = %endpoint.base_url(),
        "making interactive assets"
    );
    let mut written = dashboard::write_dashboard(&collections, dashboard_dir, endpoint)?;

    let href = relative_href(index_path, static_dir);
    let data = html::build_viewer_data(&collections, static_dir, &href);
    let page = html::render_viewer(&data)?;
    if let Some(parent) = index_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(index_path, page).with_context(|| format!("write {}", index_path.display()))?;
    written.push(index_path.to_path_buf());
    Ok(written)
}

/// Link from the page at `page` to `target`, relative when they share a root.
fn relative_href(page: &Path, target: &Path) -> String {
    let from = page.parent().unwrap_or(Path::new(""));
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = target.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    if common == 0 {
        return target.to_string_lossy().replace('\\', "/");
    }
    let mut parts: Vec<String> =
        std::iter::repeat_n("..".to_string(), from.len() - common).collect();
    parts.extend(to[common..].iter().map(|c| c.as_os_str().to_string_lossy().into_owned()));
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DATA_PRODUCTS_FNAME;
    use crate::product::{CellValue, HistogramEntry, Label, Point2D, Record, TableEntry, Tag};
    use crate::store::write_records;
    use pretty_assertions::assert_eq;

    fn seed(products: &Path, rel: &str, records: &[Record]) {
        write_records(&products.join(rel).join(DATA_PRODUCTS_FNAME), records).unwrap();
    }

    fn hist(tag: &str) -> Record {
        Record::HistogramEntry(HistogramEntry::new(vec![Tag::from(tag)], 1.0))
    }

    fn point(tag: &str) -> Record {
        Record::Point2D(Point2D::new(vec![Tag::from(tag)], 0.0, 1.0))
    }

    #[test]
    fn rerender_drops_stale_assets() {
        let tmp = tempfile::tempdir().unwrap();
        let products = tmp.path().join("products");
        let static_dir = tmp.path().join("static");
        let opts = StaticOptions::default();

        seed(&products, "a", &[hist("a")]);
        make_tables_and_figures(&products, &static_dir, Workers::SEQUENTIAL, &opts).unwrap();
        assert!(static_dir.join("a_hist.svg").is_file());

        seed(&products, "a", &[point("a")]);
        make_tables_and_figures(&products, &static_dir, Workers::SEQUENTIAL, &opts).unwrap();
        assert!(static_dir.join("a.svg").is_file());
        assert!(!static_dir.join("a_hist.svg").exists());

        let collections = load_collections(&products).unwrap();
        let data = html::build_viewer_data(&collections, &static_dir, "static");
        assert_eq!(data.nodes["a"].assets, vec!["static/a.svg".to_string()]);
    }

    #[test]
    fn shared_asset_file_is_a_collision() {
        let tmp = tempfile::tempdir().unwrap();
        let products = tmp.path().join("products");
        let static_dir = tmp.path().join("static");
        seed(&products, "a", &[hist("a")]);
        seed(&products, "a_hist", &[point("a_hist")]);

        let err = make_tables_and_figures(
            &products,
            &static_dir,
            Workers::new(2),
            &StaticOptions::default(),
        )
        .unwrap_err();
        match err.downcast_ref::<TrendifyError>() {
            Some(TrendifyError::TagPathCollision { path, .. }) => {
                assert_eq!(path, &static_dir.join("a_hist.svg"))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!static_dir.exists());
    }

    #[test]
    fn duplicate_table_cell_fails_the_pass() {
        let tmp = tempfile::tempdir().unwrap();
        let products = tmp.path().join("products");
        let static_dir = tmp.path().join("static");
        let cell = |v: f64| {
            Record::TableEntry(TableEntry::new(
                vec![Tag::from("t")],
                Label::from("run0"),
                Label::from("wave1"),
                CellValue::Number(v),
            ))
        };
        seed(&products, "t", &[cell(1.0), cell(2.0)]);
        seed(&products, "h", &[hist("h")]);

        let err = make_tables_and_figures(
            &products,
            &static_dir,
            Workers::new(2),
            &StaticOptions::default(),
        )
        .unwrap_err();
        assert!(
            err.chain().any(|e| matches!(
                e.downcast_ref::<TrendifyError>(),
                Some(TrendifyError::DuplicateCell { .. })
            )),
            "{err:#}"
        );
        assert!(!static_dir.join("t_pivot.csv").exists());
    }

    #[test]
    fn include_files_cover_the_static_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let products = tmp.path().join("products");
        let static_dir = tmp.path().join("static");
        seed(&products, "a", &[point("a")]);

        let files = make_tables_and_figures(
            &products,
            &static_dir,
            Workers::SEQUENTIAL,
            &StaticOptions::default(),
        )
        .unwrap();
        assert_eq!(files, vec![static_dir.join("a.svg"), static_dir.join("include.md")]);
        let text = fs::read_to_string(static_dir.join("include.md")).unwrap();
        assert_eq!(text, "![](a.svg)");
    }

    #[test]
    fn sibling_appends_to_last_component() {
        assert_eq!(sibling(Path::new("out/a/b"), "_hist.svg"), PathBuf::from("out/a/b_hist.svg"));
    }

    #[test]
    fn href_walks_up_from_page() {
        let page = Path::new("out/assets/interactive/index.html");
        assert_eq!(relative_href(page, Path::new("out/assets/static")), "../static");
    }
}
