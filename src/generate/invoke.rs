//! Generator Invoker: map a generator over input directories and persist
//! each directory's records next to its raw data.

use crate::Result;
use crate::config::{EmptyPolicy, InvokeOptions};
use crate::error::TrendifyError;
use crate::generate::ProductGenerator;
use crate::pool::run_units;
use crate::store::{artifact_path, remove_artifact, write_records};

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeSummary {
    pub directories: usize,
    pub records: usize,
    /// Directories that yielded no records under [`EmptyPolicy::Skip`].
    pub empty: Vec<PathBuf>,
}

/// Run `generator` over every directory in `dirs` (already ordered) and write
/// `data_products.json` into each.
///
/// A prior artifact is removed before the generator runs, so a failed or
/// rejected directory is left without one.
pub fn make_products(
    generator: &dyn ProductGenerator,
    dirs: &[PathBuf],
    opts: &InvokeOptions,
) -> Result<InvokeSummary> {
    info!(
        generator = %generator.describe(),
        directories = dirs.len(),
        workers = opts.workers.get(),
        "generating tagged data products"
    );

    let counts = run_units(
        dirs,
        opts.workers,
        opts.on_failure,
        |dir| dir.clone(),
        |dir| process_dir(generator, dir, opts.on_empty),
    )?;

    let mut summary = InvokeSummary {
        directories: dirs.len(),
        ..Default::default()
    };
    for (dir, count) in dirs.iter().zip(counts) {
        if count == 0 {
            summary.empty.push(dir.clone());
        }
        summary.records += count;
    }

    info!(
        directories = summary.directories,
        records = summary.records,
        empty = summary.empty.len(),
        "finished generating data products"
    );
    Ok(summary)
}

fn process_dir(
    generator: &dyn ProductGenerator,
    dir: &Path,
    on_empty: EmptyPolicy,
) -> Result<usize> {
    debug!(dir = %dir.display(), "processing directory");
    remove_artifact(dir)?;

    let records = generator.generate(dir).map_err(|e| {
        e.context(TrendifyError::WorkerFailure {
            unit: dir.to_path_buf(),
            generator: generator.describe(),
        })
    })?;

    if records.is_empty() {
        match on_empty {
            EmptyPolicy::Error => {
                return Err(TrendifyError::EmptyDirectory {
                    dir: dir.to_path_buf(),
                }
                .into());
            }
            EmptyPolicy::Skip => {
                warn!(dir = %dir.display(), "generator returned no records");
            }
        }
    }

    let invalid = records.iter().enumerate().find_map(|(idx, r)| {
        if r.tags().is_empty() {
            Some(format!("record {} has no tags", idx))
        } else {
            r.non_finite_field()
                .map(|field| format!("record {} has a non-finite {}", idx, field))
        }
    });
    if let Some(reason) = invalid {
        return Err(anyhow::anyhow!(reason).context(TrendifyError::WorkerFailure {
            unit: dir.to_path_buf(),
            generator: generator.describe(),
        }));
    }

    write_records(&artifact_path(dir), &records)?;
    Ok(records.len())
}
