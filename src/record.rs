//! Text formats of the persisted records.
//!
//! ```text
//! tree     one line per entry: "BLOB <fingerprint> <name>" or "TREE <id> <name>"
//! version  "<parent id | NULL>\n<tree id>\n<message>"
//! head     "<version id | NULL>"
//! counter  "<next free index>"
//! ```
//!
//! Entry names run to the end of the line, so they may contain spaces.

use crate::error::{Error, Result};
use crate::types::{Fingerprint, TreeEntry, TreeId, Version, VersionId};

/// Sentinel written where no version id exists.
pub const NULL: &str = "NULL";

const BLOB_TAG: &str = "BLOB";
const TREE_TAG: &str = "TREE";

/// Serialize tree entries, preserving their order.
pub fn encode_tree(entries: &[TreeEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let line = match entry {
            TreeEntry::Blob { fingerprint, name } => {
                format!("{} {} {}\n", BLOB_TAG, fingerprint, name)
            }
            TreeEntry::Tree { id, name } => format!("{} {} {}\n", TREE_TAG, id, name),
        };
        out.push_str(&line);
    }
    out
}

/// Parse a tree record. `label` names the record in error messages.
///
/// # Errors
/// Returns [`Error::CorruptObject`] for unknown tags, missing fields or a
/// non-numeric tree reference.
pub fn decode_tree(label: &str, text: &str) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, ' ');
        let (tag, reference, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(r), Some(n)) if !r.is_empty() && !n.is_empty() => (t, r, n),
            _ => {
                return Err(Error::corrupt(format!(
                    "{} line {}: expected 'KIND REF NAME'",
                    label,
                    lineno + 1
                )))
            }
        };
        let entry = match tag {
            BLOB_TAG => TreeEntry::blob(Fingerprint::new(reference), name),
            TREE_TAG => TreeEntry::tree(TreeId(parse_index(label, reference)?), name),
            other => {
                return Err(Error::corrupt(format!(
                    "{} line {}: unknown entry kind '{}'",
                    label,
                    lineno + 1,
                    other
                )))
            }
        };
        entries.push(entry);
    }
    Ok(entries)
}

/// Serialize a version record.
pub fn encode_version(version: &Version) -> String {
    format!(
        "{}\n{}\n{}",
        encode_optional(version.parent.map(|v| v.0)),
        version.tree,
        version.message
    )
}

/// Parse a version record.
///
/// # Errors
/// Returns [`Error::CorruptObject`] when the parent, tree or message field
/// is missing or a numeric field does not parse.
pub fn decode_version(label: &str, text: &str) -> Result<Version> {
    let mut fields = text.splitn(3, '\n');
    let (parent, tree, message) = match (fields.next(), fields.next(), fields.next()) {
        (Some(p), Some(t), Some(m)) => (p.trim(), t.trim(), m),
        _ => {
            return Err(Error::corrupt(format!(
                "{}: expected parent, tree and message lines",
                label
            )))
        }
    };
    let parent = decode_optional(label, parent)?.map(VersionId);
    let tree = TreeId(parse_index(label, tree)?);
    let message = message.strip_suffix('\n').unwrap_or(message).to_string();
    Ok(Version {
        parent,
        tree,
        message,
    })
}

/// Serialize an optional index as the number or `NULL`.
pub fn encode_optional(index: Option<u64>) -> String {
    match index {
        Some(i) => i.to_string(),
        None => NULL.to_string(),
    }
}

/// Parse a number-or-`NULL` field such as a head pointer.
pub fn decode_optional(label: &str, text: &str) -> Result<Option<u64>> {
    let text = text.trim();
    if text == NULL {
        return Ok(None);
    }
    parse_index(label, text).map(Some)
}

/// Parse a non-negative decimal index.
pub fn parse_index(label: &str, text: &str) -> Result<u64> {
    text.trim()
        .parse::<u64>()
        .map_err(|_| Error::corrupt(format!("{}: '{}' is not an index", label, text.trim())))
}
