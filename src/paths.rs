use crate::error::{Error, Result};
use crate::types::VersionId;

/// Join a working-tree relative directory and a child name with `/`.
///
/// An empty `prefix` means the working root, so the child name is returned
/// unchanged.
pub fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Validate a head (branch) name.
///
/// Head names become file names inside the metadata directory, so path
/// separators, `..`, whitespace and control characters are rejected, as is
/// the reserved word `NULL`.
///
/// # Errors
/// Returns [`Error::InvalidName`] if the name violates any rule.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name("branch name must not be empty"));
    }

    for ch in name.chars() {
        if ch == '/' || ch == '\\' || ch == ':' || ch.is_whitespace() || ch.is_control() {
            return Err(Error::invalid_name(format!(
                "branch name contains invalid character: {:?}",
                ch,
            )));
        }
    }

    if name.contains("..") || name == "." {
        return Err(Error::invalid_name("branch name must not contain '..'"));
    }

    if name == "NULL" {
        return Err(Error::invalid_name("branch name 'NULL' is reserved"));
    }

    Ok(())
}

/// Validate a working-tree entry name before it is written into a tree
/// record, which stores one entry per line.
///
/// # Errors
/// Returns [`Error::InvalidName`] for empty names or names containing `/`,
/// `\n` or `\r`.
pub fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name("entry name must not be empty"));
    }
    if name.contains(['/', '\n', '\r']) {
        return Err(Error::invalid_name(format!(
            "entry name {:?} cannot be stored in a tree record",
            name,
        )));
    }
    Ok(())
}

/// Format a version message.
///
/// If `message` is `Some`, it is used directly; otherwise the default
/// `"Version <id>"` is generated.
pub fn format_version_message(id: VersionId, message: Option<&str>) -> String {
    match message {
        Some(msg) => msg.to_string(),
        None => format!("Version {}", id),
    }
}
