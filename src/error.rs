use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for a compilation run
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error in {file}:{line}: {message}")]
    Parse {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error("duplicate operation id `{operation_id}` (controller {controller})")]
    DuplicateOperation {
        operation_id: String,
        controller: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Configuration errors raised while building entity schemas.
///
/// These fail fast and always name the offending entity or column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("entity `{entity}` is not defined (no class decorated with @Entity)")]
    UnknownEntity { entity: String },

    #[error("entity `{entity}` (table `{table}`) has no primary key column")]
    MissingPrimaryKey { entity: String, table: String },

    #[error("entity `{entity}` column `{column}` has unsupported column type `{column_type}`")]
    UnknownColumnType {
        entity: String,
        column: String,
        column_type: String,
    },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_names_file_and_line() {
        let err = Error::Parse {
            file: PathBuf::from("src/users.controller.ts"),
            line: 12,
            message: "expected `}`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "parse error in src/users.controller.ts:12: expected `}`"
        );
    }

    #[test]
    fn test_config_error_names_entity() {
        let err: Error = ConfigError::MissingPrimaryKey {
            entity: "Order".to_string(),
            table: "orders".to_string(),
        }
        .into();
        assert!(err.to_string().contains("Order"));
        assert!(err.to_string().contains("orders"));
    }
}
