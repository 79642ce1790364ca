//! Driver configuration module.
//!
//! This module provides configuration loading for the avlstore driver from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `AVLSTORE_SCRIPT`: Command script to replay (required)
//! - `AVLSTORE_DATA_FILE`: Tree file to create (default: `./avlstore.db`)
//! - `AVLSTORE_STRING_FIELDS`: Comma-separated string field lengths (default: `30,30`)
//! - `AVLSTORE_INT_FIELDS`: Number of int fields (default: `3`)
//!
//! # Invariants
//!
//! - Every string field length is at least 1

use std::path::PathBuf;

use crate::storage::Schema;

/// Driver configuration.
///
/// # Pre-conditions
///
/// When constructed via `from_env()`:
/// - All required environment variables must be set
/// - All values must be valid for their respective types
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Path of the tree file. Replaced if it already exists.
    pub data_file: PathBuf,
    /// Path of the command script.
    pub script: PathBuf,
    /// Field layout for the new tree.
    pub schema: Schema,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

const SCRIPT_VAR: &str = "AVLSTORE_SCRIPT";
const DATA_FILE_VAR: &str = "AVLSTORE_DATA_FILE";
const STRING_FIELDS_VAR: &str = "AVLSTORE_STRING_FIELDS";
const INT_FIELDS_VAR: &str = "AVLSTORE_INT_FIELDS";

impl DriverConfig {
    /// Default tree file.
    pub const DEFAULT_DATA_FILE: &'static str = "./avlstore.db";
    /// Default string field lengths.
    pub const DEFAULT_STRING_FIELDS: &'static str = "30,30";
    /// Default int field count.
    pub const DEFAULT_INT_FIELDS: u32 = 3;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `AVLSTORE_SCRIPT` is not set or is empty
    /// - `AVLSTORE_STRING_FIELDS` has an entry that is not a positive integer
    /// - `AVLSTORE_INT_FIELDS` is set but not a non-negative integer
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let script = match lookup(SCRIPT_VAR) {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            Some(_) => {
                return Err(ConfigError::InvalidValue {
                    name: SCRIPT_VAR.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            None => return Err(ConfigError::MissingEnvVar(SCRIPT_VAR.to_string())),
        };

        let data_file = lookup(DATA_FILE_VAR)
            .map_or_else(|| PathBuf::from(Self::DEFAULT_DATA_FILE), PathBuf::from);

        let string_lengths = parse_string_fields(
            lookup(STRING_FIELDS_VAR)
                .as_deref()
                .unwrap_or(Self::DEFAULT_STRING_FIELDS),
        )?;
        let int_count = lookup(INT_FIELDS_VAR).map_or(Ok(Self::DEFAULT_INT_FIELDS), |value| {
            value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                name: INT_FIELDS_VAR.to_string(),
                message: format!("'{value}' is not a valid field count"),
            })
        })?;

        Ok(Self {
            data_file,
            script,
            schema: Schema::new(string_lengths, int_count),
        })
    }
}

/// Parse a comma-separated list of string field lengths.
///
/// An empty value means no string fields.
fn parse_string_fields(value: &str) -> Result<Vec<u32>, ConfigError> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }

    value
        .split(',')
        .map(|part| match part.trim().parse::<u32>() {
            Ok(len) if len > 0 => Ok(len),
            _ => Err(ConfigError::InvalidValue {
                name: STRING_FIELDS_VAR.to_string(),
                message: format!("'{}' is not a positive field length", part.trim()),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<DriverConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        DriverConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[("AVLSTORE_SCRIPT", "people.txt")]).unwrap();
        assert_eq!(config.script, PathBuf::from("people.txt"));
        assert_eq!(config.data_file, PathBuf::from("./avlstore.db"));
        assert_eq!(config.schema, Schema::new([30, 30], 3));
    }

    #[test]
    fn test_explicit_values() {
        let config = load(&[
            ("AVLSTORE_SCRIPT", "s.txt"),
            ("AVLSTORE_DATA_FILE", "/tmp/tree.avl"),
            ("AVLSTORE_STRING_FIELDS", "10, 15,20"),
            ("AVLSTORE_INT_FIELDS", "0"),
        ])
        .unwrap();
        assert_eq!(config.data_file, PathBuf::from("/tmp/tree.avl"));
        assert_eq!(config.schema, Schema::new([10, 15, 20], 0));
    }

    #[test]
    fn test_no_string_fields() {
        let config = load(&[("AVLSTORE_SCRIPT", "s.txt"), ("AVLSTORE_STRING_FIELDS", "")]).unwrap();
        assert_eq!(config.schema.string_count(), 0);
    }

    #[test]
    fn test_missing_script() {
        assert_eq!(
            load(&[]).unwrap_err(),
            ConfigError::MissingEnvVar("AVLSTORE_SCRIPT".to_string())
        );
        assert!(matches!(
            load(&[("AVLSTORE_SCRIPT", "")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_invalid_field_values() {
        let error = load(&[("AVLSTORE_SCRIPT", "s"), ("AVLSTORE_STRING_FIELDS", "10,0")])
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid value for AVLSTORE_STRING_FIELDS: '0' is not a positive field length"
        );

        let error = load(&[("AVLSTORE_SCRIPT", "s"), ("AVLSTORE_INT_FIELDS", "-1")]).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { name, .. } if name == "AVLSTORE_INT_FIELDS"));
    }

    #[test]
    fn test_config_error_display_missing() {
        let error = ConfigError::MissingEnvVar("TEST_VAR".to_string());
        assert_eq!(
            error.to_string(),
            "missing required environment variable: TEST_VAR"
        );
    }
}
