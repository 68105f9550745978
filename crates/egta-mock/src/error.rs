use thiserror::Error;

/// Failure of a mock request, rendered as the status the live service uses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockError {
    #[error("{0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("{0}")]
    Unprocessable(String),
    /// Status forced by failure injection.
    #[error("injected failure")]
    Injected(u16),
}

pub type MockResult<T> = Result<T, MockError>;

impl MockError {
    pub fn status(&self) -> u16 {
        match self {
            MockError::BadRequest(_) => 400,
            MockError::Unauthorized => 401,
            MockError::NotFound(_) => 404,
            MockError::Conflict(_) => 409,
            MockError::Unprocessable(_) => 422,
            MockError::Injected(status) => *status,
        }
    }

    pub(crate) fn not_found(kind: &str, id: u64) -> Self {
        MockError::NotFound(format!("{kind} {id}"))
    }
}
