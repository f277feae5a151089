mod exchange;
mod price;

pub use exchange::Exchange;
pub(crate) use price::normalize_symbol;
pub use price::{
    CommonSymbol, ExchangeStats, LatestPrice, PriceComparison, PriceSample, SkipReason,
    SkippedSample,
};
