//! Local input validation for the wizard

use crate::error::ValidationError;

/// Characters never accepted in an output directory
pub const FORBIDDEN_OUTPUT_DIR_CHARS: [char; 8] = ['<', '>', ':', '"', '|', '?', '*', '\0'];

/// Check an output directory's syntax
///
/// Rejects empty (or whitespace-only) input and any of `< > : " | ? *` or NUL.
/// Existence and writability are the backend's concern.
pub fn validate_output_dir(output_dir: &str) -> Result<(), ValidationError> {
    if output_dir.trim().is_empty() {
        return Err(ValidationError::EmptyOutputDir);
    }

    if let Some(c) = output_dir
        .chars()
        .find(|c| FORBIDDEN_OUTPUT_DIR_CHARS.contains(c))
    {
        return Err(ValidationError::InvalidOutputDirChar(c));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rejected() {
        assert_eq!(validate_output_dir(""), Err(ValidationError::EmptyOutputDir));
        assert_eq!(validate_output_dir("   "), Err(ValidationError::EmptyOutputDir));
    }

    #[test]
    fn test_plain_path_accepted() {
        assert_eq!(validate_output_dir("/tmp/out"), Ok(()));
        assert_eq!(validate_output_dir("relative/out dir"), Ok(()));
    }

    #[test]
    fn test_angle_brackets_rejected() {
        assert_eq!(
            validate_output_dir("/tmp/<out>"),
            Err(ValidationError::InvalidOutputDirChar('<'))
        );
    }

    #[test]
    fn test_every_forbidden_char_rejected() {
        for c in FORBIDDEN_OUTPUT_DIR_CHARS {
            let dir = format!("/tmp/a{}b", c);
            assert_eq!(
                validate_output_dir(&dir),
                Err(ValidationError::InvalidOutputDirChar(c)),
                "{:?} should be rejected",
                c
            );
        }
    }
}
