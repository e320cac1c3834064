use crate::Result;
use crate::generate::ProductGenerator;
use crate::product::Record;

use anyhow::{Context, bail};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Generator backed by a standalone file.
///
/// The file is run as `<interpreter> <file> [qualifier] <directory>` (or
/// directly for executables) and must print a JSON array of records on
/// stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    path: PathBuf,
    interpreter: Option<&'static str>,
    qualifier: Option<String>,
}

fn interpreter_for(ext: &str) -> Option<&'static str> {
    match ext {
        "sh" => Some("sh"),
        "py" => Some("python3"),
        "rb" => Some("ruby"),
        "pl" => Some("perl"),
        "js" => Some("node"),
        _ => None,
    }
}

impl CommandGenerator {
    /// Checks only that the file exists; the interpreter is found at run time.
    pub fn load(path: &Path, qualifier: Option<String>) -> std::result::Result<Self, String> {
        if !path.is_file() {
            return Err(format!("generator file {} does not exist", path.display()));
        }
        let path = path
            .canonicalize()
            .map_err(|e| format!("cannot resolve {}: {}", path.display(), e))?;
        let interpreter = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(interpreter_for);
        Ok(Self {
            path,
            interpreter,
            qualifier,
        })
    }

    fn command(&self, dir: &Path) -> Command {
        let mut cmd = match self.interpreter {
            Some(interp) => {
                let mut c = Command::new(interp);
                c.arg(&self.path);
                c
            }
            None => Command::new(&self.path),
        };
        if let Some(q) = &self.qualifier {
            cmd.arg(q);
        }
        cmd.arg(dir);
        cmd
    }
}

impl ProductGenerator for CommandGenerator {
    fn generate(&self, dir: &Path) -> Result<Vec<Record>> {
        debug!(generator = %self.describe(), dir = %dir.display(), "running generator file");
        let output = self
            .command(dir)
            .output()
            .with_context(|| format!("spawn generator {}", self.describe()))?;

        if !output.status.success() {
            bail!(
                "generator {} exited with {}: {}",
                self.describe(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        serde_json::from_slice(&output.stdout).with_context(|| {
            format!(
                "generator {} printed invalid records for {}",
                self.describe(),
                dir.display()
            )
        })
    }

    fn describe(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}:{}", self.path.display(), q),
            None => self.path.display().to_string(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::product::Tag;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn script_receives_qualifier_and_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("gen.sh");
        fs::write(
            &script,
            r#"printf '[{"kind":"HistogramEntry","tags":["%s"],"value":1}]' "$1""#,
        )
        .unwrap();

        let generator = CommandGenerator::load(&script, Some("custom".into())).unwrap();
        let records = generator.generate(tmp.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tags(), &[Tag::from("custom")]);
    }

    #[test]
    fn failing_script_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("fail.sh");
        fs::write(&script, "echo nope >&2; exit 3").unwrap();

        let generator = CommandGenerator::load(&script, None).unwrap();
        let err = generator.generate(tmp.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("nope"));
    }
}
