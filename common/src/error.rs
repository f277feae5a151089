use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DbError(String),

    #[error("Exchange API error: {0}")]
    ExchangeError(String),

    #[error("Parsing error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// True when an exchange could not return usable data
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Error::HttpError(_) | Error::ExchangeError(_) | Error::ParseError(_)
        )
    }
}
