//! Product generators: resolving a specifier string to something that maps a
//! directory to records, and invoking it across directories.
//!
//! Specifier shape: `path-or-module[:qualifier]`, where the qualifier is a
//! function name or `Class.method`.
//! - `./gen.sh`, `/abs/gen.py:summarize` -> [`CommandGenerator`] (runs the file)
//! - `trendify.examples:example_data_product_generator` -> [`BuiltinGenerator`]

pub mod builtin;
pub mod command;
pub mod invoke;

pub use builtin::BuiltinGenerator;
pub use command::CommandGenerator;
pub use invoke::{InvokeSummary, make_products};

use crate::Result;
use crate::error::TrendifyError;
use crate::product::Record;

use regex::Regex;
use std::path::Path;

/// Maps one input directory to the records found there.
pub trait ProductGenerator: Send + Sync {
    fn generate(&self, dir: &Path) -> Result<Vec<Record>>;

    /// Human-readable name for logs.
    fn describe(&self) -> String;
}

/// File extensions loaded as standalone generator files.
pub const FILE_EXTENSIONS: &[&str] = &["sh", "py", "rb", "pl", "js", "exe", "bin"];

/// A parsed, not yet resolved, generator specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorSpec {
    File {
        path: String,
        qualifier: Option<String>,
    },
    Module {
        module: String,
        qualifier: Option<String>,
    },
}

// 1) target: everything up to an optional trailing `:qualifier`
// 2) qualifier: `name` or `Class.method`
const SPEC_RE: &str = r"^(.+?)(?::([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?))?$";
const MODULE_RE: &str = r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$";

impl GeneratorSpec {
    pub fn parse(spec: &str) -> std::result::Result<Self, TrendifyError> {
        let fail = |reason: &str| TrendifyError::Resolution {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let spec_re = Regex::new(SPEC_RE).map_err(|e| fail(&e.to_string()))?;
        let module_re = Regex::new(MODULE_RE).map_err(|e| fail(&e.to_string()))?;

        let caps = spec_re
            .captures(spec.trim())
            .ok_or_else(|| fail("expected path-or-module[:qualifier]"))?;
        let target = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let qualifier = caps.get(2).map(|m| m.as_str().to_string());

        let is_file = Path::new(target)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FILE_EXTENSIONS.contains(&e));

        if is_file {
            Ok(GeneratorSpec::File {
                path: target.to_string(),
                qualifier,
            })
        } else if module_re.is_match(target) {
            Ok(GeneratorSpec::Module {
                module: target.to_string(),
                qualifier,
            })
        } else {
            Err(fail(
                "target is neither a generator file nor a dotted module path",
            ))
        }
    }
}

/// Resolve a specifier to a generator, picking the file or module strategy
/// from the specifier's shape.
pub fn resolve(spec: &str) -> std::result::Result<Box<dyn ProductGenerator>, TrendifyError> {
    match GeneratorSpec::parse(spec)? {
        GeneratorSpec::File { path, qualifier } => {
            let generator = CommandGenerator::load(Path::new(&path), qualifier).map_err(|reason| {
                TrendifyError::Resolution {
                    spec: spec.to_string(),
                    reason,
                }
            })?;
            Ok(Box::new(generator))
        }
        GeneratorSpec::Module { module, qualifier } => {
            let generator = BuiltinGenerator::lookup(&module, qualifier.as_deref()).map_err(
                |reason| TrendifyError::Resolution {
                    spec: spec.to_string(),
                    reason,
                },
            )?;
            Ok(Box::new(generator))
        }
    }
}
