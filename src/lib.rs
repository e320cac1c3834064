//! Tagged data-product post-processing.
//!
//! A user generator maps each batch-run directory to a list of tagged
//! [`Record`]s. The records are sorted by tag into a products tree, then
//! rendered to tables, figures and a dashboard definition.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod generate;
pub mod pool;
pub mod product;
pub mod render;
pub mod sample;
pub mod store;

pub use error::TrendifyError;
pub use product::{Record, Tag, TagAtom};

pub type Result<T> = anyhow::Result<T>;
