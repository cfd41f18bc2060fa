//! Error kinds for the census pipeline
//!
//! Every variant is fatal to the current invocation. Nothing is retried;
//! the command surface maps each kind to an exit code via [`CensusError::exit_code`].

use thiserror::Error;

/// Exit code for usage errors (EINVAL), kept for compatibility with the
/// historical command surface.
pub const EXIT_USAGE: i32 = 22;

/// Failure reported by a [`KeyValueStore`](crate::ceph::KeyValueStore)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key `{0}` not found")]
    NotFound(String),
    #[error("key `{key}`: {message}")]
    Backend { key: String, message: String },
}

#[derive(Debug, Error)]
pub enum CensusError {
    #[error("`{command}` failed with exit code {code}: {stderr}")]
    Query {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` returned malformed JSON: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("field `{field}` is missing or null in {document}")]
    Schema { document: String, field: String },

    #[error("cluster identity could not be persisted: {0}")]
    Persistence(String),

    #[error("unexpected ownership field --{0} (expected one of: name, organization, email, description, url)")]
    Validation(String),

    #[error("{0}")]
    Configuration(String),

    #[error("failed to publish, server responded with code {status}: {body}")]
    Publish { status: u16, body: String },

    #[error("failed to unpublish, server responded with code {status}")]
    Unpublish { status: u16 },

    #[error("key-value store error: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to encode report: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

impl CensusError {
    pub fn schema(document: &str, field: &str) -> Self {
        CensusError::Schema {
            document: document.to_string(),
            field: field.to_string(),
        }
    }

    /// Process exit code the command surface reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CensusError::Usage(_) | CensusError::Validation(_) => EXIT_USAGE,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CensusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CensusError::Usage("x".into()).exit_code(), 22);
        assert_eq!(CensusError::Validation("bogus".into()).exit_code(), 22);
        assert_eq!(CensusError::Unpublish { status: 404 }.exit_code(), 1);
        assert_eq!(CensusError::schema("crush map", "types").exit_code(), 1);
    }

    #[test]
    fn test_messages_carry_context() {
        let err = CensusError::Publish { status: 500, body: "boom".into() };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));

        let err = CensusError::Validation("bogus".into());
        assert!(err.to_string().contains("--bogus"));
    }
}
