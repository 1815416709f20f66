//! Name validation and shared-storage file naming.

use crate::error::CoreError;

/// Longest object name accepted as an artifact base name.
pub const MAX_NAME_LEN: usize = 255;

/// Check that a name can be used both as an in-host name and as the base
/// name of a file in the shared directory.
pub fn validate_object_name(name: &str) -> Result<(), CoreError> {
    let invalid = |reason| CoreError::InvalidName {
        name: name.to_owned(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name is too long"));
    }
    if name == "." || name == ".." {
        return Err(invalid("name is a relative path component"));
    }
    if name.contains(['/', '\\']) {
        return Err(invalid("name contains a path separator"));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("name contains a control character"));
    }

    Ok(())
}

/// The artifact file name for an object: `<name>.<ext>`.
pub fn artifact_file_name(name: &str, extension: &str) -> String {
    format!("{}.{}", name, extension.trim_start_matches('.'))
}

/// Strip directory and extension from an artifact path.
///
/// Both `/` and `\` count as separators so paths written by either host
/// platform are handled.
pub fn split_file_name(path: &str) -> &str {
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(idx) => &base[..idx],
    }
}
