//! Field validators shared by request DTOs

use validator::ValidationError;

/// Product and library names: 1-255 characters once trimmed
pub fn validate_name(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, 255)
}

/// Taxonomy entry names: 1-100 characters once trimmed
pub fn validate_taxonomy_name(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, 100)
}

fn trimmed_length(value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len == 0 || len > max {
        return Err(ValidationError::new("length")
            .with_message(format!("name must be 1-{} characters", max).into()));
    }
    Ok(())
}
