use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EgtaError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    Conflict(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("server error {status}: {body}")]
    Server { status: StatusCode, body: String },
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<EgtaError>,
    },
}

pub type Result<T> = std::result::Result<T, EgtaError>;

impl EgtaError {
    /// Maps a non-success response onto the error taxonomy.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => EgtaError::NotFound(body),
            StatusCode::CONFLICT => EgtaError::Conflict(body),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                EgtaError::Validation(body)
            }
            s if s.is_server_error() => EgtaError::Server { status, body },
            _ => EgtaError::Status { status, body },
        }
    }

    /// HTTP status carried by this error, if it came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            EgtaError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            EgtaError::Conflict(_) => Some(StatusCode::CONFLICT),
            EgtaError::Server { status, .. } | EgtaError::Status { status, .. } => Some(*status),
            EgtaError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// The innermost cause, looking through `RetriesExhausted`.
    pub fn root(&self) -> &EgtaError {
        match self {
            EgtaError::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), EgtaError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), EgtaError::Conflict(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.root(), EgtaError::Validation(_))
    }
}
