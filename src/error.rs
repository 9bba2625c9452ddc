// Error types for the worker client. Every failure is reported once, to the
// caller of the operation that produced it; nothing here is retried.

use crate::models::ResponseError;
use reqwest::StatusCode;
use thiserror::Error;

/// Missing configuration, surfaced before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cloudflare user id is required")]
    UserIdRequired,

    #[error("cloudflare token is required")]
    TokenRequired,
}

#[derive(Error, Debug)]
pub enum Error {
    /// The integration is switched off. Callers should skip the feature
    /// rather than treat this as a fault.
    #[error("cloudflare is disabled")]
    Disabled,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid worker url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("cloudflare token is not a valid header value")]
    InvalidToken,

    #[error("script identifier must not be empty")]
    EmptyIdentifier,

    #[error("duplicate binding name {0}")]
    DuplicateBinding(String),

    #[error("duplicate multipart part name {0}")]
    DuplicatePart(String),

    #[error("error encoding worker metadata: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("error creating {action} request: {source}")]
    Request {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("error {action}: {source}")]
    Transport {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("error {action} ({status}): {body}")]
    Rejected {
        action: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("error uploading worker: {}", format_errors(.errors))]
    Unsuccessful { errors: Vec<ResponseError> },

    #[error("error decoding upload response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("cloudflare client is closed")]
    Closed,
}

impl Error {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Error::Disabled)
    }

    /// HTTP status of a remote rejection, if that is what this is.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn format_errors(errors: &[ResponseError]) -> String {
    if errors.is_empty() {
        return "no error details returned".into();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
