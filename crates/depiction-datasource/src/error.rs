//! Error types for datasource operations.

use crate::guid::Guid;

/// Errors raised by the ledger, the scene arena and configuration loading.
///
/// Operation failures reported by a backend are not errors here: they
/// travel as `success = false` on the operation outcome.
#[derive(Debug, thiserror::Error)]
pub enum DatasourceError {
    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Jsonl(#[from] crate::jsonl::JsonlError),

    /// A JSON payload is not an object or carries a malformed reserved field.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid guid {value:?}: {source}")]
    InvalidGuid {
        value: String,
        #[source]
        source: uuid::Error,
    },

    /// The scene already holds a live entity with this id.
    #[error("duplicate entity: {0}")]
    DuplicateEntity(Guid),

    #[error("unknown entity: {0}")]
    UnknownEntity(Guid),
}
