use crate::utils::error::{RecordsError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// The data directory is joined with fixed file names, so only obviously
/// unusable values are refused here.
pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    let reason = if path.trim().is_empty() {
        "a directory is required"
    } else if path.contains('\0') {
        "NUL bytes are not allowed in paths"
    } else {
        return Ok(());
    };
    Err(RecordsError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: path.to_string(),
        reason: reason.to_string(),
    })
}

/// Names, codes and topics typed at the console go through here.
pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RecordsError::ValidationError {
            message: format!("{} cannot be empty or whitespace-only", field_name),
        });
    }
    if value.contains(['\n', '\r']) {
        return Err(RecordsError::ValidationError {
            message: format!("{} cannot span several lines", field_name),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(RecordsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("expected {}..={}", min, max),
        });
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(RecordsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "must be a finite number above zero".to_string(),
        });
    }
    Ok(())
}
