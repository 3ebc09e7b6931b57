use thiserror::Error;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Git command failed: {0}")]
    GitError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP error status {status}: {body}")]
    DeliveryError { status: u16, body: String },

    #[error("Invalid branch regex '{pattern}': {source}")]
    InvalidBranchRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Malformed push line: '{0}'")]
    MalformedPushLine(String),

    #[error("{0}")]
    Other(String),
}

impl HookError {
    /// Process exit status for this failure. Delivery failures are reported
    /// separately so the pushing side can tell them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            HookError::DeliveryError { .. } => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, HookError>;
