//! Key validation for filesystem-derived names
//!
//! Parameter and metric keys become file stems, and run IDs become
//! directory names, so they must be safe path components on every platform.

use crate::{Error, Result};

/// Characters that are illegal in file names on at least one major platform.
const ILLEGAL_CHARS: [char; 7] = ['<', '>', ':', '"', '|', '?', '*'];

/// Validate a key that will be used as a single path component.
///
/// Rejects:
/// - the empty string
/// - keys containing `/` or `\` (path traversal)
/// - `.` and `..`
/// - keys containing any of `< > : " | ? *`
///
/// # Errors
///
/// Returns [`Error::InvalidKey`] describing the first rule the key breaks.
///
/// # Example
///
/// ```rust
/// use trueno_track::experiment::validate_key;
///
/// assert!(validate_key("learning_rate").is_ok());
/// assert!(validate_key("../escape").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        "key must not be empty"
    } else if key.contains(['/', '\\']) {
        "key must not contain path separators"
    } else if key == "." || key == ".." {
        "key must not be a relative path component"
    } else if key.contains(ILLEGAL_CHARS) {
        "key contains an illegal filename character (< > : \" | ? *)"
    } else {
        return Ok(());
    };

    Err(Error::InvalidKey {
        key: key.to_string(),
        reason,
    })
}
