//! Generation and validation of the string codes used as external
//! identifiers.
//!
//! Jobs, job data entries, and blob heads are all addressed by 36-character
//! lowercase codes (hyphenated v4 UUIDs). Owner identities and use-codes
//! follow the surrounding service's identifier formats and are validated
//! before anything is written.

use uuid::Uuid;

use crate::error::AppError;
use crate::result::AppResult;

/// Length of a generated code (hyphenated UUID).
pub const CODE_LEN: usize = 36;

/// Generate a fresh 36-character lowercase code.
pub fn generate_code() -> String {
    Uuid::new_v4().to_string()
}

/// Check whether a string is a well-formed code: exactly 36 characters of
/// lowercase ASCII alphanumerics and hyphens.
pub fn is_valid_code(value: &str) -> bool {
    value.len() == CODE_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Check a use-code: one or more lowercase ASCII alphanumerics and hyphens.
pub fn is_valid_use_code(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Check an owner nickname: 4 to 16 lowercase ASCII alphanumerics, matching
/// the external user-identity format.
pub fn is_valid_owner_nickname(value: &str) -> bool {
    (4..=16).contains(&value.len())
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Check a job-type code; same character class as a use-code.
pub fn is_valid_job_type_code(value: &str) -> bool {
    is_valid_use_code(value)
}

/// Validate a code, returning a validation error naming the field.
pub fn ensure_code(field: &str, value: &str) -> AppResult<()> {
    if is_valid_code(value) {
        return Ok(());
    }
    Err(AppError::validation(format!(
        "malformed {field} [{value}]"
    )))
}

/// Validate a use-code.
pub fn ensure_use_code(value: &str) -> AppResult<()> {
    if is_valid_use_code(value) {
        return Ok(());
    }
    Err(AppError::validation(format!("malformed use code [{value}]")))
}

/// Validate an owner nickname.
pub fn ensure_owner_nickname(value: &str) -> AppResult<()> {
    if is_valid_owner_nickname(value) {
        return Ok(());
    }
    Err(AppError::validation(format!(
        "malformed owner nickname [{value}]"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_is_valid() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LEN);
        assert!(is_valid_code(&code));
    }

    #[test]
    fn test_code_rejects_uppercase_and_bad_length() {
        assert!(!is_valid_code("ABCDEF01-2345-6789-abcd-ef0123456789"));
        assert!(!is_valid_code("abc"));
        assert!(!is_valid_code(""));
    }

    #[test]
    fn test_use_code() {
        assert!(is_valid_use_code("report"));
        assert!(is_valid_use_code("icon-archive"));
        assert!(!is_valid_use_code(""));
        assert!(!is_valid_use_code("Report"));
        assert!(!is_valid_use_code("icon archive"));
    }

    #[test]
    fn test_owner_nickname_bounds() {
        assert!(is_valid_owner_nickname("alice"));
        assert!(is_valid_owner_nickname("a1b2"));
        assert!(!is_valid_owner_nickname("abc"));
        assert!(!is_valid_owner_nickname("abcdefghijklmnopq"));
        assert!(!is_valid_owner_nickname("Alice"));
    }

    #[test]
    fn test_ensure_code_error_kind() {
        let err = ensure_code("job code", "nope").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }
}
