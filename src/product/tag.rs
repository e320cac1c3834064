//! Tags: hierarchical keys used to sort records.
//!
//! A tag such as `["plots", "trace"]` doubles as a relative output path
//! (`plots/trace`). On the wire a tag is a JSON array of atoms; a bare
//! scalar is read as a one-atom tag.
//!
//! Ordering is derived so tags can key a BTreeMap and sort deterministically.

use crate::error::TrendifyError;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagAtom {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for TagAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagAtom::Bool(b) => write!(f, "{}", b),
            TagAtom::Int(i) => write!(f, "{}", i),
            TagAtom::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TagAtom {
    fn from(s: &str) -> Self {
        TagAtom::Str(s.to_string())
    }
}

impl From<String> for TagAtom {
    fn from(s: String) -> Self {
        TagAtom::Str(s)
    }
}

impl From<i64> for TagAtom {
    fn from(i: i64) -> Self {
        TagAtom::Int(i)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "TagRepr", into = "Vec<TagAtom>")]
pub struct Tag(Vec<TagAtom>);

#[derive(Deserialize)]
#[serde(untagged)]
enum TagRepr {
    One(TagAtom),
    Many(Vec<TagAtom>),
}

impl TryFrom<TagRepr> for Tag {
    type Error = String;

    fn try_from(repr: TagRepr) -> Result<Self, Self::Error> {
        match repr {
            TagRepr::One(atom) => Ok(Tag(vec![atom])),
            TagRepr::Many(atoms) if atoms.is_empty() => Err("tag must not be empty".to_string()),
            TagRepr::Many(atoms) => Ok(Tag(atoms)),
        }
    }
}

impl From<Tag> for Vec<TagAtom> {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

impl Tag {
    /// Build a tag from its path components. Returns `None` for an empty path.
    pub fn new(atoms: Vec<TagAtom>) -> Option<Self> {
        if atoms.is_empty() {
            None
        } else {
            Some(Self(atoms))
        }
    }

    /// Tag made only of string atoms, e.g. `Tag::path(["plots", "trace"])`.
    #[cfg(test)]
    pub(crate) fn path<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let atoms: Vec<TagAtom> = parts.into_iter().map(|p| TagAtom::Str(p.into())).collect();
        assert!(!atoms.is_empty(), "tag path must have at least one component");
        Self(atoms)
    }

    pub fn atoms(&self) -> &[TagAtom] {
        &self.0
    }

    /// `plots.trace`, used in dashboard URLs.
    pub fn dotted(&self) -> String {
        self.join(".")
    }

    /// `plots_trace`, used for flat file names.
    pub fn underscored(&self) -> String {
        self.join("_")
    }

    fn join(&self, sep: &str) -> String {
        self.0
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(sep)
    }

    /// Relative output path with one segment per atom.
    pub fn relative_path(&self) -> Result<PathBuf, TrendifyError> {
        let mut path = PathBuf::new();
        for atom in &self.0 {
            let segment = atom.to_string();
            let reason = if segment.is_empty() {
                Some("empty component")
            } else if segment == "." || segment == ".." {
                Some("relative path component")
            } else if segment.contains('/') || segment.contains('\\') {
                Some("component contains a path separator")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(TrendifyError::InvalidTag {
                    tag: self.clone(),
                    reason: format!("{} {:?}", reason, segment),
                });
            }
            path.push(segment);
        }
        Ok(path)
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Tag(vec![TagAtom::from(s)])
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn scalar_and_array_forms_parse() {
        let tags: Vec<Tag> = serde_json::from_str(r#"["hist", ["plots", "trace"], 3]"#).unwrap();
        assert_eq!(
            tags,
            vec![
                Tag::from("hist"),
                Tag::path(["plots", "trace"]),
                Tag::new(vec![TagAtom::Int(3)]).unwrap(),
            ]
        );
        // Always written back as arrays.
        assert_eq!(
            serde_json::to_string(&tags).unwrap(),
            r#"[["hist"],["plots","trace"],[3]]"#
        );
    }

    #[test]
    fn empty_tag_is_rejected() {
        assert!(serde_json::from_str::<Tag>("[]").is_err());
        assert!(Tag::new(vec![]).is_none());
    }

    #[test]
    fn relative_path_nests_components() {
        let tag = Tag::new(vec![TagAtom::from("runs"), TagAtom::Int(7)]).unwrap();
        assert_eq!(tag.relative_path().unwrap(), Path::new("runs").join("7"));
        assert_eq!(tag.dotted(), "runs.7");
        assert_eq!(tag.underscored(), "runs_7");
    }

    #[test]
    fn unsafe_components_are_invalid() {
        for bad in ["..", ".", "", "a/b"] {
            let err = Tag::path(["ok", bad]).relative_path().unwrap_err();
            assert!(matches!(err, TrendifyError::InvalidTag { .. }), "{bad:?}");
        }
    }
}
