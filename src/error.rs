use std::path::PathBuf;

use thiserror::Error;

use crate::product::{Label, Tag};

/// Fatal conditions of a trendify run. Everything here terminates the run.
#[derive(Debug, Error)]
pub enum TrendifyError {
    #[error("cannot resolve generator '{spec}': {reason}")]
    Resolution { spec: String, reason: String },

    #[error("generator returned no records for directory {}", dir.display())]
    EmptyDirectory { dir: PathBuf },

    #[error("generator {generator} failed on {}", unit.display())]
    WorkerFailure { unit: PathBuf, generator: String },

    #[error("{} of the work units failed: {}", failures.len(), summarize(failures))]
    WorkerFailures { failures: Vec<(PathBuf, String)> },

    #[error("duplicate table cell ({row}, {col}) in tag {tag}")]
    DuplicateCell { tag: Tag, row: Label, col: Label },

    #[error("missing data products artifact {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("malformed data products artifact {}: {message}", path.display())]
    MalformedArtifact { path: PathBuf, message: String },

    #[error("tag {tag} cannot be used as an output path: {reason}")]
    InvalidTag { tag: Tag, reason: String },

    #[error("tags {first} and {second} both map to output path {}", path.display())]
    TagPathCollision {
        first: Tag,
        second: Tag,
        path: PathBuf,
    },
}

fn summarize(failures: &[(PathBuf, String)]) -> String {
    failures
        .iter()
        .map(|(unit, message)| format!("{} ({})", unit.display(), message))
        .collect::<Vec<_>>()
        .join("; ")
}
