//! # Diff Computation and Replay
//!
//! Turns "last synchronized content" plus "current content" into a `Patch`, and
//! turns an ordered sequence of patches back into content.
//!
//! ## Formats
//!
//! - **`DiffFormat::Lines`**: a line-level diff (Myers, via `similar`) encoded
//!   as an edit script of `keep`/`delete`/`insert` operations. Keep and delete
//!   lengths are counted in bytes of the prior content, so applying a script
//!   does not depend on how lines were tokenized when it was computed.
//! - **`DiffFormat::Snapshot`**: every patch is the whole new content.
//!
//! A file without prior synchronized content always produces a `Patch::Full`
//! carrying the complete content, whatever the format.
//!
//! Only UTF-8 text is supported. Binary files are rejected with
//! `DiffComputationFailed` rather than stored as whole-content blobs.
//!
//! `replay` is a pure function: the same base and the same ordered patches
//! always produce byte-identical output.

use serde::{Deserialize, Serialize};
use similar::{DiffTag, TextDiff};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::{Error, Result};

/// How the DiffComputer encodes changes to files that already have history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffFormat {
    /// Line-level edit script
    #[default]
    Lines,
    /// Whole-content replacement on every commit
    Snapshot,
}

impl fmt::Display for DiffFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffFormat::Lines => write!(f, "lines"),
            DiffFormat::Snapshot => write!(f, "snapshot"),
        }
    }
}

impl FromStr for DiffFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "lines" => Ok(DiffFormat::Lines),
            "snapshot" => Ok(DiffFormat::Snapshot),
            other => Err(Error::ConfigParse {
                message: format!("unknown diff format '{}'", other),
                hint: Some("Use 'lines' or 'snapshot'".to_string()),
            }),
        }
    }
}

/// Tag stored next to a diff telling replay how to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind {
    Full,
    Lines,
}

impl PatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchKind::Full => "full",
            PatchKind::Lines => "lines",
        }
    }
}

impl FromStr for PatchKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(PatchKind::Full),
            "lines" => Ok(PatchKind::Lines),
            other => Err(Error::MalformedItem {
                message: format!("unknown patch kind '{}'", other),
            }),
        }
    }
}

/// One step of an edit script. Lengths are byte counts of the prior content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edit {
    Keep(usize),
    Delete(usize),
    Insert(String),
}

/// A transformation from one file content to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    /// Replace everything with this content
    Full(String),
    /// Apply an edit script to the current content
    Lines(Vec<Edit>),
}

/// An edit script that does not fit the content it is applied to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("edit at byte {offset} needs {needed} bytes but content has {available}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("edit at byte {offset} splits a UTF-8 character")]
    CharBoundary { offset: usize },
    #[error("{remaining} trailing bytes are not covered by the edit script")]
    Unconsumed { remaining: usize },
}

impl Patch {
    pub fn kind(&self) -> PatchKind {
        match self {
            Patch::Full(_) => PatchKind::Full,
            Patch::Lines(_) => PatchKind::Lines,
        }
    }

    /// Textual form stored in a commit record's `diff` attribute.
    pub fn encode(&self) -> Result<String> {
        match self {
            Patch::Full(content) => Ok(content.clone()),
            Patch::Lines(edits) => Ok(serde_json::to_string(edits)?),
        }
    }

    /// Parses the textual form produced by `encode`.
    pub fn decode(kind: PatchKind, text: &str) -> Result<Self> {
        match kind {
            PatchKind::Full => Ok(Patch::Full(text.to_string())),
            PatchKind::Lines => Ok(Patch::Lines(serde_json::from_str(text)?)),
        }
    }

    /// Applies the patch to `base`.
    pub fn apply(&self, base: &str) -> std::result::Result<String, PatchError> {
        let edits = match self {
            Patch::Full(content) => return Ok(content.clone()),
            Patch::Lines(edits) => edits,
        };

        let mut output = String::with_capacity(base.len());
        let mut cursor = 0;
        for edit in edits {
            match edit {
                Edit::Keep(len) => {
                    output.push_str(take(base, cursor, *len)?);
                    cursor += len;
                }
                Edit::Delete(len) => {
                    take(base, cursor, *len)?;
                    cursor += len;
                }
                Edit::Insert(text) => output.push_str(text),
            }
        }

        if cursor != base.len() {
            return Err(PatchError::Unconsumed {
                remaining: base.len() - cursor,
            });
        }
        Ok(output)
    }
}

fn take(base: &str, offset: usize, len: usize) -> std::result::Result<&str, PatchError> {
    let end = offset.checked_add(len).filter(|end| *end <= base.len());
    let Some(end) = end else {
        return Err(PatchError::OutOfBounds {
            offset,
            needed: len,
            available: base.len().saturating_sub(offset),
        });
    };
    base.get(offset..end)
        .ok_or(PatchError::CharBoundary { offset })
}

/// Replays `patches` in order on top of `base`.
pub fn replay<'a, I>(base: &str, patches: I) -> std::result::Result<String, PatchError>
where
    I: IntoIterator<Item = &'a Patch>,
{
    let mut content = base.to_string();
    for patch in patches {
        content = patch.apply(&content)?;
    }
    Ok(content)
}

/// Computes patches between synchronized and current file content.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffComputer {
    format: DiffFormat,
}

impl DiffComputer {
    pub fn new(format: DiffFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> DiffFormat {
        self.format
    }

    /// Returns `None` when `current` equals the synchronized content.
    pub fn compute(&self, last_synced: Option<&str>, current: &str) -> Option<Patch> {
        match last_synced {
            None => Some(Patch::Full(current.to_string())),
            Some(old) if old == current => None,
            Some(_) if self.format == DiffFormat::Snapshot => {
                Some(Patch::Full(current.to_string()))
            }
            Some(old) => Some(Patch::Lines(line_edits(old, current))),
        }
    }

    /// Like `compute`, starting from raw file bytes.
    ///
    /// `path` is only used for error messages.
    pub fn compute_bytes(
        &self,
        path: &str,
        last_synced: Option<&str>,
        current: &[u8],
    ) -> Result<Option<Patch>> {
        let current = std::str::from_utf8(current).map_err(|e| Error::DiffComputationFailed {
            path: path.to_string(),
            message: format!("binary content is not supported ({})", e),
        })?;
        Ok(self.compute(last_synced, current))
    }
}

fn push_edit(edits: &mut Vec<Edit>, edit: Edit) {
    match (edits.last_mut(), edit) {
        (Some(Edit::Keep(n)), Edit::Keep(m)) => *n += m,
        (Some(Edit::Delete(n)), Edit::Delete(m)) => *n += m,
        (Some(Edit::Insert(text)), Edit::Insert(more)) => text.push_str(&more),
        (_, edit) => edits.push(edit),
    }
}

fn line_edits(old: &str, new: &str) -> Vec<Edit> {
    let diff = TextDiff::from_lines(old, new);
    let old_lines = diff.old_slices();
    let new_lines = diff.new_slices();
    let bytes = |lines: &[&str]| lines.iter().map(|line| line.len()).sum::<usize>();

    let mut edits = Vec::new();
    for op in diff.ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => push_edit(&mut edits, Edit::Keep(bytes(&old_lines[old_range]))),
            DiffTag::Delete => push_edit(&mut edits, Edit::Delete(bytes(&old_lines[old_range]))),
            DiffTag::Insert => push_edit(&mut edits, Edit::Insert(new_lines[new_range].concat())),
            DiffTag::Replace => {
                push_edit(&mut edits, Edit::Delete(bytes(&old_lines[old_range])));
                push_edit(&mut edits, Edit::Insert(new_lines[new_range].concat()));
            }
        }
    }
    edits
}
