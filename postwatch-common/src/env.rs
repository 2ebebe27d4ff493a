//! Environment-variable parsing.
//!
//! All configuration is read from the environment once, at construction of
//! each component's config struct. This helper keeps the lookups uniform:
//! absent variables fall back to documented defaults at the call site, and
//! unparseable values fail startup instead of being silently ignored.

use std::str::FromStr;

use thiserror::Error;

/// A variable was set but could not be parsed into the expected type.
#[derive(Debug, Error)]
#[error("invalid value for {name}: {value:?}")]
pub struct EnvVarError {
    pub name: &'static str,
    pub value: String,
}

/// Read and parse an environment variable.
///
/// Returns `Ok(None)` when the variable is unset so the caller can apply
/// its default.
///
/// # Errors
/// Returns an error if the variable is set but does not parse as `T`, or is
/// not valid unicode.
pub fn var<T: FromStr>(name: &'static str) -> Result<Option<T>, EnvVarError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map(Some).map_err(|_| EnvVarError {
            name,
            value: raw,
        }),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(EnvVarError {
            name,
            value: "<non-unicode>".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_variable_is_none() {
        let value: Option<u64> = var("POSTWATCH_TEST_UNSET").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_error_display_names_the_variable() {
        let error = EnvVarError {
            name: "UPDATE_INTERVAL_SECS",
            value: "not-a-number".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "invalid value for UPDATE_INTERVAL_SECS: \"not-a-number\""
        );
    }
}
