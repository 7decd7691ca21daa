use thiserror::Error;

/// Failures when talking to the row store or object storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not reach the data store: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("the data store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("could not decode a row from `{table}`: {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode a payload for `{table}`: {source}")]
    Encode {
        table: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no row in `{table}` matched the request")]
    NoSuchRow { table: String },
    #[error("unexpected response from the data store: {0}")]
    Unexpected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
