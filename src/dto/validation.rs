//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a room pin is exactly 6 ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    if pin.len() != 6 || !pin.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("pin_format");
        err.message = Some("pin must be exactly 6 digits".into());
        return Err(err);
    }
    Ok(())
}

/// Validates a participant nickname: 1 to 20 characters after trimming.
pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    let trimmed = nickname.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 20 {
        let mut err = ValidationError::new("nickname_length");
        err.message = Some("nickname must be 1 to 20 characters".into());
        return Err(err);
    }
    Ok(())
}
