use db::StoreError;
use thiserror::Error;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";
pub const DUPLICATE_EMAIL: &str =
    "This email is already registered for this raffle.";
pub const RAFFLE_FULL: &str =
    "This raffle has already reached its number of winners.";

/// Outcome of a failed operation. The `Display` text is the message shown
/// to the user.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Invalid(String),
    #[error("The data store could not complete the request ({0}).")]
    Store(#[from] StoreError),
    #[error("The image could not be uploaded ({0}).")]
    Upload(String),
    #[error("The export could not be produced ({0}).")]
    Export(String),
}

impl Error {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Error::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Error::Forbidden(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::Invalid(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
