//! Persisted record lists and input-directory discovery.

use crate::Result;
use crate::config::DATA_PRODUCTS_FNAME;
use crate::error::TrendifyError;
use crate::product::Record;

use anyhow::{Context, bail};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Location of the per-directory artifact for `dir`.
pub fn artifact_path(dir: &Path) -> PathBuf {
    dir.join(DATA_PRODUCTS_FNAME)
}

/// Load a record list. A missing file and an unparsable file are distinct
/// errors; records without tags are treated as malformed.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(TrendifyError::MissingArtifact {
                path: path.to_path_buf(),
            }
            .into());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("read artifact {}", path.display()));
        }
    };

    let records: Vec<Record> =
        serde_json::from_str(&text).map_err(|e| TrendifyError::MalformedArtifact {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if let Some(idx) = records.iter().position(|r| r.tags().is_empty()) {
        return Err(TrendifyError::MalformedArtifact {
            path: path.to_path_buf(),
            message: format!("record {} has no tags", idx),
        }
        .into());
    }

    Ok(records)
}

/// Write a record list, replacing any previous file at `path`.
///
/// The list is written to a sibling temp file first and renamed into place,
/// so readers never observe a half-written artifact.
pub fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(records)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Remove the artifact of `dir` if present.
pub fn remove_artifact(dir: &Path) -> Result<()> {
    let path = artifact_path(dir);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
    }
}

/// Expand input globs into a sorted, de-duplicated list of directories.
///
/// A matched file stands for its containing directory.
pub fn discover_dirs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut dirs = BTreeSet::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let entries =
            glob::glob(pattern).with_context(|| format!("bad input glob {:?}", pattern))?;
        for entry in entries {
            let path = entry.with_context(|| format!("read glob match for {:?}", pattern))?;
            let dir = if path.is_file() {
                match path.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                    _ => PathBuf::from("."),
                }
            } else {
                path
            };
            dirs.insert(dir);
        }
    }
    if dirs.is_empty() {
        bail!(
            "no input directories matched {:?}",
            patterns.iter().map(|p| p.as_ref()).collect::<Vec<_>>()
        );
    }
    Ok(sort_dirs(dirs.into_iter().collect()))
}

/// Order directories numerically by name when every name is an integer,
/// otherwise lexicographically by full path.
pub fn sort_dirs(mut dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let numeric: Option<Vec<i64>> = dirs
        .iter()
        .map(|d| d.file_name()?.to_str()?.parse::<i64>().ok())
        .collect();
    match numeric {
        Some(keys) => {
            let mut keyed: Vec<(i64, PathBuf)> = keys.into_iter().zip(dirs).collect();
            keyed.sort();
            keyed.into_iter().map(|(_, d)| d).collect()
        }
        None => {
            dirs.sort();
            dirs
        }
    }
}
