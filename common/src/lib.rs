pub mod compare;
pub mod error;
pub mod models;

pub use compare::{ComparisonBatch, Comparator};
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
