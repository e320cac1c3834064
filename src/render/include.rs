//! Nested `include.md` files over the static asset tree, for pulling tables
//! and figures into a Markdown site (mkdocs macros syntax).
//!
//! Every directory gets one file listing, in order: its pivot and stats
//! tables, its figures, then the `include.md` of each child directory.

use crate::Result;

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const INCLUDE_FNAME: &str = "include.md";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeOptions {
    /// Heading depth of the root directory. Headings are only written for
    /// directories with more than one inclusion.
    pub heading_level: Option<usize>,
    /// Prepended to figure links, e.g. a local server serving the tree.
    pub figure_prefix: Option<String>,
}

fn slash_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_table(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.ends_with("pivot.csv") || name.ends_with("stats.csv")
}

fn is_figure(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".svg")
}

fn include_text(dir: &Path, root: &Path, depth: usize, opts: &IncludeOptions) -> Result<String> {
    let mut tables = Vec::new();
    let mut figures = Vec::new();
    let mut children = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry.with_context(|| format!("read {}", dir.display()))?.path();
        let rel = slash_path(path.strip_prefix(root).unwrap_or(&path));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if path.is_dir() {
            children.push(format!("{{% include '{}/{}' %}}", rel, INCLUDE_FNAME));
        } else if is_table(&name) {
            tables.push(format!("{{{{ read_csv('{}', disable_numparse=True) }}}}", rel));
        } else if is_figure(&name) {
            let link = match &opts.figure_prefix {
                Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), rel),
                None => rel,
            };
            figures.push(format!("![]({})", link));
        }
    }
    tables.sort();
    figures.sort();
    children.sort();

    let mut blocks: Vec<String> = Vec::new();
    let count = tables.len() + figures.len() + children.len();
    if let Some(level) = opts.heading_level.filter(|_| count > 1) {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        blocks.push(format!("{} {}", "#".repeat(level + depth), name));
    }
    blocks.extend(tables);
    blocks.extend(figures);
    blocks.extend(children);
    Ok(blocks.join("\n\n"))
}

/// Write `include.md` into `root` and every directory below it.
pub fn write_include_files(root: &Path, opts: &IncludeOptions) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let text = include_text(entry.path(), root, entry.depth(), opts)?;
        let path = entry.path().join(INCLUDE_FNAME);
        fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn nested_includes_list_tables_figures_then_children() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("table_pivot.csv"));
        touch(&root.join("table_stats.csv"));
        touch(&root.join("table_melted.csv"));
        touch(&root.join("plots/trace.svg"));

        let written = write_include_files(root, &IncludeOptions::default()).unwrap();
        assert_eq!(
            written,
            vec![root.join(INCLUDE_FNAME), root.join("plots").join(INCLUDE_FNAME)]
        );

        let top = fs::read_to_string(root.join(INCLUDE_FNAME)).unwrap();
        assert_eq!(
            top,
            "{{ read_csv('table_pivot.csv', disable_numparse=True) }}\n\n\
             {{ read_csv('table_stats.csv', disable_numparse=True) }}\n\n\
             {% include 'plots/include.md' %}"
        );
        let plots = fs::read_to_string(root.join("plots").join(INCLUDE_FNAME)).unwrap();
        assert_eq!(plots, "![](plots/trace.svg)");
    }

    #[test]
    fn headings_and_figure_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("plots/a.svg"));
        touch(&root.join("plots/a_hist.svg"));

        let opts = IncludeOptions {
            heading_level: Some(2),
            figure_prefix: Some("//localhost:8001/".into()),
        };
        write_include_files(root, &opts).unwrap();
        let plots = fs::read_to_string(root.join("plots").join(INCLUDE_FNAME)).unwrap();
        assert_eq!(
            plots,
            "### plots\n\n![](//localhost:8001/plots/a.svg)\n\n![](//localhost:8001/plots/a_hist.svg)"
        );
        // A single inclusion gets no heading.
        let top = fs::read_to_string(root.join(INCLUDE_FNAME)).unwrap();
        assert_eq!(top, "{% include 'plots/include.md' %}");
    }
}
