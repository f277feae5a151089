mod config;
mod error;
mod price_store;

pub use config::{StoreConfig, DEFAULT_DB_PATH};
pub use error::StoreError;
pub use price_store::{PriceStore, PruneSummary};
