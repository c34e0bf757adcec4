use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("request to {endpoint} failed: {source}")]
    Fetch {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("response from {endpoint} is not valid JSON: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no venue found matching '{0}'")]
    VenueNotFound(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("unparseable date '{0}'")]
    BadDate(String),

    #[error("store error: {message}")]
    Store { message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
