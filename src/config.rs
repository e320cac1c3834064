//! Run configuration shared by the CLI and the library entry points.

use clap::ValueEnum;
use std::path::PathBuf;
use tracing::warn;

/// File name of every persisted record list, per input directory and per tag.
pub const DATA_PRODUCTS_FNAME: &str = "data_products.json";

/// Upper bound on workers, as a multiple of the available cores.
const MAX_WORKERS_PER_CORE: usize = 5;

/// Number of parallel workers. `1` runs every unit sequentially on the
/// calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workers(usize);

impl Workers {
    pub const SEQUENTIAL: Workers = Workers(1);

    /// Clamp a requested count to `1..=5 * cores`.
    pub fn new(requested: usize) -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let max = MAX_WORKERS_PER_CORE * cores;
        if requested > max {
            warn!(requested, max, "worker count capped");
        }
        Workers(requested.clamp(1, max))
    }

    pub fn get(&self) -> usize {
        self.0
    }

    pub fn is_sequential(&self) -> bool {
        self.0 == 1
    }
}

impl Default for Workers {
    fn default() -> Self {
        Self::SEQUENTIAL
    }
}

/// What to do when a unit of work fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Stop at the first failure.
    #[default]
    Abort,
    /// Finish every unit, then report all failures together.
    Continue,
}

/// What to do when a generator returns no records for a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum EmptyPolicy {
    #[default]
    Error,
    /// Warn and persist an empty artifact.
    Skip,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InvokeOptions {
    pub workers: Workers,
    pub on_failure: FailurePolicy,
    pub on_empty: EmptyPolicy,
}

/// Where the live data is served from, for dashboard target URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 8000,
        }
    }
}

impl Endpoint {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}/data_products", self.protocol, self.host, self.port)
    }
}

/// Directory layout under the trendify output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Tag-sorted record collections.
    pub fn products_dir(&self) -> PathBuf {
        self.root.join("products")
    }

    pub fn static_assets_dir(&self) -> PathBuf {
        self.root.join("assets").join("static")
    }

    pub fn interactive_assets_dir(&self) -> PathBuf {
        self.root.join("assets").join("interactive")
    }

    pub fn dashboard_dir(&self) -> PathBuf {
        self.interactive_assets_dir().join("dashboard")
    }

    /// HTML viewer of the whole tree.
    pub fn index_path(&self) -> PathBuf {
        self.interactive_assets_dir().join("index.html")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn workers_are_clamped() {
        assert_eq!(Workers::new(0).get(), 1);
        assert!(Workers::new(1).is_sequential());
        let huge = Workers::new(usize::MAX);
        assert!(huge.get() >= 5);
        assert!(huge.get() < usize::MAX);
    }

    #[test]
    fn layout_paths() {
        let layout = OutputLayout::new("/out");
        assert_eq!(layout.products_dir(), Path::new("/out/products"));
        assert_eq!(layout.static_assets_dir(), Path::new("/out/assets/static"));
        assert_eq!(
            layout.dashboard_dir(),
            Path::new("/out/assets/interactive/dashboard")
        );
    }

    #[test]
    fn endpoint_url() {
        let ep = Endpoint {
            port: 9001,
            ..Default::default()
        };
        assert_eq!(ep.base_url(), "http://localhost:9001/data_products");
    }
}
