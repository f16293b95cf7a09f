//! Validation helpers for configuration values

pub use crate::error::ValidationError;

/// A configuration section that can validate itself
pub trait ConfigSection: Default {
    /// Returns every problem found; `Ok` when the section is usable
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Section name used in field paths and error reports
    fn section_name(&self) -> &'static str;
}

/// Common validators for config values
pub struct Validator;

impl Validator {
    /// Validates that a numeric value is within a range
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            Err(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Validates that a string is not blank
    pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, "must not be empty"))
        } else {
            Ok(())
        }
    }

    /// Validates that a string looks like `<scheme>://<host>...` with an allowed scheme
    pub fn url(value: &str, schemes: &[&str], field: &str) -> Result<(), ValidationError> {
        let Some((scheme, rest)) = value.split_once("://") else {
            return Err(ValidationError::with_value(field, "must be an absolute URL", value));
        };

        if !schemes.contains(&scheme) {
            return Err(ValidationError::with_value(
                field,
                format!("scheme must be one of: {}", schemes.join(", ")),
                value,
            ));
        }

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(ValidationError::with_value(field, "must name a host", value));
        }
        Ok(())
    }

    /// Collects multiple validation results into a single result
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(|r| r.err()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
