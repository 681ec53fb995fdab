use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: String, reason: String },
}

pub type ProjectionResult<T> = Result<T, ProjectionError>;

impl ProjectionError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ProjectionError::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn require_finite(field: &str, value: f64) -> ProjectionResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProjectionError::invalid(field, "must be a finite number"))
    }
}

pub(crate) fn require_non_negative(field: &str, value: f64) -> ProjectionResult<f64> {
    require_finite(field, value)?;
    if value < 0.0 {
        return Err(ProjectionError::invalid(field, "must be >= 0"));
    }
    Ok(value)
}

/// Rates and fractions are accepted in `[0, 1]`.
pub(crate) fn require_unit_interval(field: &str, value: f64) -> ProjectionResult<f64> {
    require_finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ProjectionError::invalid(field, "must be between 0 and 1"));
    }
    Ok(value)
}
