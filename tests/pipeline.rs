use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use walkdir::WalkDir;

use trendify::aggregate::{load_collections, sort_products};
use trendify::config::{InvokeOptions, OutputLayout, Workers};
use trendify::generate::{ProductGenerator, make_products, resolve};
use trendify::product::{HistogramEntry, Record, Tag};
use trendify::render::{StaticOptions, make_interactive, make_tables_and_figures};
use trendify::sample::make_sample_data;
use trendify::store::{artifact_path, read_records, sort_dirs};
use trendify::{Result, TrendifyError};

/// One histogram entry tagged `hist`, valued by the directory's number.
struct DirNumber;

impl ProductGenerator for DirNumber {
    fn generate(&self, dir: &Path) -> Result<Vec<Record>> {
        let name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name == "empty" {
            return Ok(vec![]);
        }
        Ok(vec![Record::HistogramEntry(HistogramEntry::new(
            vec![Tag::from("hist")],
            name.parse()?,
        ))])
    }

    fn describe(&self) -> String {
        "dir-number".to_string()
    }
}

fn make_dirs(root: &Path, names: &[&str]) -> Vec<PathBuf> {
    let dirs: Vec<PathBuf> = names.iter().map(|n| root.join(n)).collect();
    for d in &dirs {
        fs::create_dir_all(d).unwrap();
    }
    sort_dirs(dirs)
}

/// Every file under `root`, keyed by relative path.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

fn run_pipeline(workdir: &Path, out: &Path, workers: Workers) {
    let dirs = make_sample_data(workdir, 4, 7).unwrap();
    let generator = resolve("trendify.examples:example_data_product_generator").unwrap();
    let opts = InvokeOptions {
        workers,
        ..Default::default()
    };
    make_products(generator.as_ref(), &dirs, &opts).unwrap();

    let layout = OutputLayout::new(out);
    sort_products(&dirs, &layout.products_dir(), workers).unwrap();
    make_tables_and_figures(
        &layout.products_dir(),
        &layout.static_assets_dir(),
        workers,
        &StaticOptions::default(),
    )
    .unwrap();
    make_interactive(
        &layout.products_dir(),
        &layout.dashboard_dir(),
        &layout.index_path(),
        &layout.static_assets_dir(),
        &Default::default(),
    )
    .unwrap();
}

#[test]
fn histogram_entries_from_three_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = make_dirs(tmp.path(), &["3", "1", "2"]);
    let summary = make_products(&DirNumber, &dirs, &InvokeOptions::default()).unwrap();
    assert_eq!(summary.records, 3);

    let products = tmp.path().join("out/products");
    sort_products(&dirs, &products, Workers::SEQUENTIAL).unwrap();

    let records = read_records(&products.join("hist/data_products.json")).unwrap();
    let values: Vec<f64> = records
        .iter()
        .map(|r| match r {
            Record::HistogramEntry(h) => h.value,
            other => panic!("unexpected {:?}", other.kind()),
        })
        .collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0]);
    assert_eq!(values.iter().sum::<f64>(), 6.0);
}

#[test]
fn empty_directory_fails_without_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = make_dirs(tmp.path(), &["empty"]);
    fs::write(artifact_path(&dirs[0]), "[]").unwrap();

    let err = make_products(&DirNumber, &dirs, &InvokeOptions::default()).unwrap_err();
    assert!(
        err.chain().any(|e| matches!(
            e.downcast_ref::<TrendifyError>(),
            Some(TrendifyError::EmptyDirectory { .. })
        )),
        "{err:#}"
    );
    assert!(!artifact_path(&dirs[0]).exists());
}

#[test]
fn full_pipeline_writes_every_asset() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("trendify");
    run_pipeline(&tmp.path().join("work"), &out, Workers::SEQUENTIAL);

    let layout = OutputLayout::new(&out);
    let tags: Vec<String> = load_collections(&layout.products_dir())
        .unwrap()
        .iter()
        .map(|c| c.tag.dotted())
        .collect();
    assert_eq!(tags, vec!["histogram", "scatter_plot", "table", "trace_plot"]);

    let static_dir = layout.static_assets_dir();
    for file in [
        "histogram_hist.svg",
        "scatter_plot.svg",
        "trace_plot.svg",
        "table_melted.csv",
        "table_pivot.csv",
        "table_stats.csv",
    ] {
        assert!(static_dir.join(file).is_file(), "missing {file}");
    }
    assert!(layout.dashboard_dir().join("dashboard.json").is_file());
    assert!(layout.dashboard_dir().join("panels/trace_plot_xy_panel.json").is_file());
    assert!(layout.index_path().is_file());

    let pivot = fs::read_to_string(static_dir.join("table_pivot.csv")).unwrap();
    assert_eq!(pivot.lines().next(), Some("row,wave1,wave2,wave3"));
    assert_eq!(pivot.lines().count(), 5);
}

#[test]
fn reruns_are_byte_identical() {
    let tmp = tempfile::tempdir().unwrap();
    let work = tmp.path().join("work");
    let out = tmp.path().join("out");

    run_pipeline(&work, &out, Workers::SEQUENTIAL);
    let first = snapshot(&out);
    run_pipeline(&work, &out, Workers::SEQUENTIAL);
    assert_eq!(snapshot(&out), first);
}

#[test]
fn worker_count_does_not_change_output() {
    let tmp = tempfile::tempdir().unwrap();
    run_pipeline(&tmp.path().join("w1"), &tmp.path().join("o1"), Workers::SEQUENTIAL);
    run_pipeline(&tmp.path().join("w4"), &tmp.path().join("o4"), Workers::new(4));

    let one = snapshot(&tmp.path().join("o1/products"));
    let four = snapshot(&tmp.path().join("o4/products"));
    assert_eq!(one, four);
    let one = snapshot(&tmp.path().join("o1/assets/static"));
    let four = snapshot(&tmp.path().join("o4/assets/static"));
    assert_eq!(one, four);
}

#[test]
fn nan_in_raw_data_is_rejected_before_persisting() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = make_dirs(tmp.path(), &["0"]);
    fs::write(dirs[0].join("results.csv"), "time,a\n0,1\n1,NaN\n").unwrap();

    let generator = resolve("trendify.examples:example_data_product_generator").unwrap();
    let err = make_products(generator.as_ref(), &dirs, &InvokeOptions::default()).unwrap_err();
    assert!(
        err.chain().any(|e| matches!(
            e.downcast_ref::<TrendifyError>(),
            Some(TrendifyError::WorkerFailure { .. })
        )),
        "{err:#}"
    );
    assert!(format!("{err:#}").contains("non-finite"), "{err:#}");
    assert!(!artifact_path(&dirs[0]).exists());
}
