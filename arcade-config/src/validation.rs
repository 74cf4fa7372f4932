//! Configuration validation traits and utilities

use crate::error::{ConfigError, ConfigResult};
use std::time::Duration;

/// Trait for validatable configuration
pub trait Validatable {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;

    /// Helper to create a domain-specific validation error
    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Validate a required string field
pub fn validate_required_string(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} cannot be empty", field_name),
        });
    }
    Ok(())
}

/// Validate a positive number
pub fn validate_positive<T>(value: T, field_name: &str, domain: &str) -> ConfigResult<()>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value <= T::default() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0, got {}", field_name, value),
        });
    }
    Ok(())
}

/// Validate that a duration is not zero
///
/// Sub-second durations are accepted; only an exact zero is rejected.
pub fn validate_nonzero_duration(value: Duration, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.is_zero() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0", field_name),
        });
    }
    Ok(())
}

/// Validate that a value is one of the allowed choices
pub fn validate_enum_choice<T: AsRef<str>>(
    value: &str,
    choices: &[T],
    field_name: &str,
    domain: &str,
) -> ConfigResult<()> {
    if !choices.iter().any(|choice| choice.as_ref() == value) {
        let valid: Vec<&str> = choices.iter().map(|c| c.as_ref()).collect();
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!(
                "{} must be one of [{}], got '{}'",
                field_name,
                valid.join(", "),
                value
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required_string() {
        assert!(validate_required_string("value", "field", "test").is_ok());
        assert!(validate_required_string("", "field", "test").is_err());
        assert!(validate_required_string("   ", "field", "test").is_err());
    }

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(1u64, "field", "test").is_ok());
        assert!(validate_positive(0usize, "field", "test").is_err());
    }

    #[test]
    fn test_validate_nonzero_duration() {
        assert!(validate_nonzero_duration(Duration::from_millis(10), "grace", "test").is_ok());
        let err = validate_nonzero_duration(Duration::ZERO, "grace", "test").unwrap_err();
        assert!(err.to_string().contains("grace must be greater than 0"));
    }

    #[test]
    fn test_validate_enum_choice() {
        assert!(validate_enum_choice("json", &["json", "text"], "format", "logging").is_ok());
        assert!(validate_enum_choice("xml", &["json", "text"], "format", "logging").is_err());
    }
}
