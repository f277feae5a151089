use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Data conversion error: {0}")]
    ConversionError(String),
}

impl From<StoreError> for common::Error {
    fn from(err: StoreError) -> Self {
        common::Error::DbError(err.to_string())
    }
}
