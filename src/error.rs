use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HubError {
    #[error("invalid hub url: {0}")]
    InvalidHubUrl(String),

    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("{url} returned status {status}: {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("hub file has no content")]
    EmptyHubFile,

    #[error("{mode} stanza is missing mandatory key '{key}'")]
    MissingKey { mode: &'static str, key: &'static str },

    #[error("'{given}' isn't a valid data type, the valid ones are: '{valid}'")]
    #[diagnostic(help("omit the data type to use 'genomics'"))]
    InvalidDataType { given: String, valid: String },

    #[error("the hub {url} is already submitted, please delete it before resubmitting it again")]
    AlreadySubmitted { url: String },

    #[error(
        "the hub {url} is already submitted by a different user (the original submitter's email: {email})"
    )]
    SubmittedByOther { url: String, email: String },

    #[error("only the original submitter can delete the hub {url}")]
    NotOwner { url: String },

    #[error("hub not found: {0}")]
    HubNotFound(String),

    #[error("trackdb not found: {0}")]
    TrackdbNotFound(i64),

    #[error("search index request failed: {0}")]
    Indexing(String),

    #[error("search index returned status {status}: {message}")]
    IndexStatus { status: u16, message: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{kind} '{name}' is not seeded")]
    UnknownLookup { kind: &'static str, name: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl HubError {
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            HubError::Http { .. } | HubError::HttpStatus { .. } | HubError::InvalidHubUrl(_)
        )
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, HubError::EmptyHubFile | HubError::MissingKey { .. })
    }

    pub fn is_duplicate_submission(&self) -> bool {
        matches!(
            self,
            HubError::AlreadySubmitted { .. } | HubError::SubmittedByOther { .. }
        )
    }

    pub fn is_indexing(&self) -> bool {
        matches!(self, HubError::Indexing(_) | HubError::IndexStatus { .. })
    }
}

impl From<rusqlite::Error> for HubError {
    fn from(err: rusqlite::Error) -> Self {
        HubError::Storage(err.to_string())
    }
}
