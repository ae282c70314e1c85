use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("xml error: {0}")]
    Xml(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OAI-PMH error [{code}]: {message}")]
    Oai { code: String, message: String },

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("gave up on {url} after {attempts} retries")]
    RetriesExhausted { url: String, attempts: u32 },

    #[error("invalid date `{0}`, expected YYYY-mm-dd")]
    InvalidDate(String),

    #[error("invalid set `{set}`, choose one of: {allowed}")]
    InvalidSet { set: String, allowed: String },

    #[error("invalid field `{0}`")]
    InvalidField(String),

    #[error("unknown export format `{0}`")]
    InvalidFormat(String),

    #[error("invalid url: {0}")]
    Url(String),

    #[error("environment: {0}")]
    Env(String),

    #[error("s3 error: {0}")]
    S3(String),
}

impl From<quick_xml::de::DeError> for Error {
    fn from(err: quick_xml::de::DeError) -> Self {
        Error::Xml(err.to_string())
    }
}
