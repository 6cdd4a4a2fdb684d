use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// An environment variable held a value that does not parse.
    #[error("Invalid value for {variable}: {value:?}")]
    InvalidVariable { variable: String, value: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
