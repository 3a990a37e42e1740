//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dto::matches::MatchSettingsDto;

/// Validates that the LATE phase starts strictly after the MID phase.
pub fn validate_phase_delays(settings: &MatchSettingsDto) -> Result<(), ValidationError> {
    if settings.late_delay_seconds <= settings.mid_delay_seconds {
        let mut err = ValidationError::new("phase_delays_order");
        err.message = Some(
            format!(
                "late delay ({}) must be greater than mid delay ({})",
                settings.late_delay_seconds, settings.mid_delay_seconds
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that a match code is six uppercase alphanumeric characters.
pub fn validate_match_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != 6
        || !code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
    {
        let mut err = ValidationError::new("match_code_format");
        err.message = Some("match code must be 6 uppercase letters or digits".into());
        return Err(err);
    }

    Ok(())
}
