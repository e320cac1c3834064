//! Aggregator: regroup per-directory record lists into per-tag collections.
//!
//! Output tree shape (tag components as nested directories):
//!   products/hist/data_products.json
//!   products/plots/trace/data_products.json
//!
//! A record with N tags is copied into N collections. Collection order follows
//! the directory scan order, then record order within a directory.

use crate::Result;
use crate::config::{DATA_PRODUCTS_FNAME, FailurePolicy, Workers};
use crate::error::TrendifyError;
use crate::pool::run_units;
use crate::product::{HistogramEntry, Point2D, Record, TableEntry, Tag, Trace2D};
use crate::store::{artifact_path, read_records, write_records};

use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// All records sharing one tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TagCollection {
    pub tag: Tag,
    pub records: Vec<Record>,
}

impl TagCollection {
    pub fn table_entries(&self) -> Vec<&TableEntry> {
        self.records
            .iter()
            .filter_map(|r| match r {
                Record::TableEntry(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn points(&self) -> Vec<&Point2D> {
        self.records
            .iter()
            .filter_map(|r| match r {
                Record::Point2D(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn traces(&self) -> Vec<&Trace2D> {
        self.records
            .iter()
            .filter_map(|r| match r {
                Record::Trace2D(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn histogram_entries(&self) -> Vec<&HistogramEntry> {
        self.records
            .iter()
            .filter_map(|r| match r {
                Record::HistogramEntry(h) => Some(h),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSummary {
    pub directories: usize,
    pub records: usize,
    /// Tag and collection size, in tag order.
    pub collections: Vec<(Tag, usize)>,
}

/// Load every directory's artifact and group records by tag.
///
/// Any missing or malformed artifact aborts the pass.
pub fn collect_by_tag(dirs: &[PathBuf]) -> Result<BTreeMap<Tag, Vec<Record>>> {
    let mut by_tag: BTreeMap<Tag, Vec<Record>> = BTreeMap::new();
    for (n, dir) in dirs.iter().enumerate() {
        debug!(dir = %dir.display(), n, total = dirs.len(), "collecting tagged records");
        let records = read_records(&artifact_path(dir))
            .with_context(|| format!("aggregate directory {}", dir.display()))?;
        for record in records {
            for tag in record.tags() {
                by_tag.entry(tag.clone()).or_default().push(record.clone());
            }
        }
    }
    Ok(by_tag)
}

/// Map each tag to its output directory, rejecting unsafe tags and tags that
/// would share an output.
///
/// Besides the nested directory, the flat underscored name (panel and asset
/// files) and the dotted name (dashboard URLs) must be unique per tag.
fn plan_outputs(
    products_dir: &Path,
    by_tag: BTreeMap<Tag, Vec<Record>>,
) -> Result<Vec<(PathBuf, TagCollection)>> {
    let mut owners: BTreeMap<PathBuf, Tag> = BTreeMap::new();
    let mut planned = Vec::with_capacity(by_tag.len());
    for (tag, records) in by_tag {
        let rel = tag.relative_path()?;
        let names = [
            rel.clone(),
            PathBuf::from(tag.underscored()),
            PathBuf::from(tag.dotted()),
        ];
        for name in names {
            claim_output(&mut owners, name, &tag)?;
        }
        planned.push((products_dir.join(rel), TagCollection { tag, records }));
    }
    Ok(planned)
}

/// Record `tag` as the owner of `path`, failing if another tag owns it.
pub(crate) fn claim_output(
    owners: &mut BTreeMap<PathBuf, Tag>,
    path: PathBuf,
    tag: &Tag,
) -> std::result::Result<(), TrendifyError> {
    match owners.get(&path) {
        Some(first) if first != tag => Err(TrendifyError::TagPathCollision {
            first: first.clone(),
            second: tag.clone(),
            path,
        }),
        Some(_) => Ok(()),
        None => {
            owners.insert(path, tag.clone());
            Ok(())
        }
    }
}

/// Remove collection artifacts left by an earlier run.
fn remove_stale(products_dir: &Path) -> Result<()> {
    if !products_dir.exists() {
        return Ok(());
    }
    for entry in WalkDir::new(products_dir) {
        let entry = entry.with_context(|| format!("walk {}", products_dir.display()))?;
        if entry.file_type().is_file() && entry.file_name() == DATA_PRODUCTS_FNAME {
            fs::remove_file(entry.path())
                .with_context(|| format!("remove stale {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Sort the records of `dirs` by tag into `products_dir`.
///
/// Collections are built by one sequential scan; writing them out is spread
/// over `workers` since every tag owns a distinct directory.
pub fn sort_products(
    dirs: &[PathBuf],
    products_dir: &Path,
    workers: Workers,
) -> Result<SortSummary> {
    info!(directories = dirs.len(), out = %products_dir.display(), "sorting data products by tag");

    let by_tag = collect_by_tag(dirs)?;
    let records = by_tag.values().map(Vec::len).sum();
    let planned = plan_outputs(products_dir, by_tag)?;

    fs::create_dir_all(products_dir)
        .with_context(|| format!("create {}", products_dir.display()))?;
    remove_stale(products_dir)?;

    run_units(
        &planned,
        workers,
        FailurePolicy::Abort,
        |(dir, _)| dir.clone(),
        |(dir, collection)| write_records(&dir.join(DATA_PRODUCTS_FNAME), &collection.records),
    )?;

    let summary = SortSummary {
        directories: dirs.len(),
        records,
        collections: planned
            .iter()
            .map(|(_, c)| (c.tag.clone(), c.records.len()))
            .collect(),
    };
    info!(
        collections = summary.collections.len(),
        records = summary.records,
        "finished sorting by tag"
    );
    Ok(summary)
}

/// Load every collection under `products_dir`, in path order.
///
/// The tag of a collection is the record tag whose path matches the
/// collection's directory.
pub fn load_collections(products_dir: &Path) -> Result<Vec<TagCollection>> {
    let mut out = Vec::new();
    let walker = WalkDir::new(products_dir).sort_by_file_name();
    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", products_dir.display()))?;
        if !entry.file_type().is_file() || entry.file_name() != DATA_PRODUCTS_FNAME {
            continue;
        }
        let path = entry.path();
        let rel = path
            .parent()
            .and_then(|p| p.strip_prefix(products_dir).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let records = read_records(path)?;

        let tag = records
            .iter()
            .flat_map(|r| r.tags())
            .find(|t| t.relative_path().is_ok_and(|p| p == rel))
            .cloned();
        let tag = match tag {
            Some(t) => t,
            None => Tag::new(
                rel.iter()
                    .map(|s| s.to_string_lossy().into_owned().into())
                    .collect(),
            )
            .ok_or_else(|| TrendifyError::MalformedArtifact {
                path: path.to_path_buf(),
                message: "collection is not inside a tag directory".to_string(),
            })?,
        };
        out.push(TagCollection { tag, records });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::TagAtom;
    use pretty_assertions::assert_eq;

    fn hist(tags: Vec<Tag>, v: f64) -> Record {
        Record::HistogramEntry(HistogramEntry::new(tags, v))
    }

    fn seed(root: &Path, name: &str, records: &[Record]) -> PathBuf {
        let dir = root.join(name);
        write_records(&artifact_path(&dir), records).unwrap();
        dir
    }

    #[test]
    fn multi_tag_records_are_copied_per_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let a = Tag::from("a");
        let ab = Tag::path(["a", "b"]);
        let d = seed(tmp.path(), "1", &[hist(vec![a.clone(), ab.clone()], 1.0)]);

        let mut by_tag = collect_by_tag(&[d]).unwrap();
        assert_eq!(by_tag.len(), 2);

        // Mutating one copy leaves the other untouched.
        if let Some(Record::HistogramEntry(h)) = by_tag.get_mut(&a).unwrap().first_mut() {
            h.value = 99.0;
        }
        assert_eq!(by_tag[&ab], vec![hist(vec![a.clone(), ab.clone()], 1.0)]);
    }

    #[test]
    fn nested_tags_write_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        let d = seed(
            tmp.path(),
            "1",
            &[hist(vec![Tag::from("a")], 1.0), hist(vec![Tag::path(["a", "b"])], 2.0)],
        );
        let out = tmp.path().join("products");
        sort_products(&[d], &out, Workers::SEQUENTIAL).unwrap();
        assert!(out.join("a").join(DATA_PRODUCTS_FNAME).is_file());
        assert!(out.join("a").join("b").join(DATA_PRODUCTS_FNAME).is_file());

        let loaded = load_collections(&out).unwrap();
        let tags: Vec<Tag> = loaded.iter().map(|c| c.tag.clone()).collect();
        assert_eq!(tags, vec![Tag::from("a"), Tag::path(["a", "b"])]);
    }

    #[test]
    fn missing_artifact_halts() {
        let tmp = tempfile::tempdir().unwrap();
        let good = seed(tmp.path(), "1", &[hist(vec![Tag::from("h")], 1.0)]);
        let missing = tmp.path().join("2");
        let out = tmp.path().join("products");
        let err = sort_products(&[good, missing], &out, Workers::SEQUENTIAL).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrendifyError>(),
            Some(TrendifyError::MissingArtifact { .. })
        ));
        assert!(!out.join("h").join(DATA_PRODUCTS_FNAME).exists());
    }

    #[test]
    fn colliding_tag_paths_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let int_tag = Tag::new(vec![TagAtom::Int(3)]).unwrap();
        let str_tag = Tag::from("3");
        let d = seed(tmp.path(), "1", &[hist(vec![int_tag, str_tag], 1.0)]);
        let err = sort_products(&[d], &tmp.path().join("products"), Workers::SEQUENTIAL)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrendifyError>(),
            Some(TrendifyError::TagPathCollision { .. })
        ));
    }

    #[test]
    fn flattened_tag_names_must_be_unique() {
        let cases = [
            (Tag::from("plots_trace"), Tag::path(["plots", "trace"]), "plots_trace"),
            (Tag::from("a.b"), Tag::path(["a", "b"]), "a.b"),
        ];
        for (flat, nested, shared) in cases {
            let tmp = tempfile::tempdir().unwrap();
            let d = seed(tmp.path(), "1", &[hist(vec![flat, nested], 1.0)]);
            let err = sort_products(&[d], &tmp.path().join("products"), Workers::SEQUENTIAL)
                .unwrap_err();
            match err.downcast_ref::<TrendifyError>() {
                Some(TrendifyError::TagPathCollision { path, .. }) => {
                    assert_eq!(path, &PathBuf::from(shared))
                }
                other => panic!("unexpected {:?}", other),
            }
            assert!(!tmp.path().join("products").exists());
        }
    }

    #[test]
    fn stale_collections_are_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("products");
        let old = seed(tmp.path(), "1", &[hist(vec![Tag::from("old")], 1.0)]);
        sort_products(&[old.clone()], &out, Workers::SEQUENTIAL).unwrap();

        write_records(&artifact_path(&old), &[hist(vec![Tag::from("new")], 1.0)]).unwrap();
        sort_products(&[old], &out, Workers::SEQUENTIAL).unwrap();
        assert!(!out.join("old").join(DATA_PRODUCTS_FNAME).exists());
        assert!(out.join("new").join(DATA_PRODUCTS_FNAME).exists());
    }
}
