use crate::models::Exchange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single price observed on an exchange during a fetch cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSample {
    /// Normalised trading-pair symbol (e.g., "BTC")
    pub symbol: String,
    /// The exchange this price is from
    pub exchange: Exchange,
    /// Observed price
    pub price: f64,
    /// When the exchange was queried
    pub observed_at: DateTime<Utc>,
}

impl PriceSample {
    /// Build a validated sample. The symbol is trimmed and upper-cased so that
    /// both exchanges share one join key.
    pub fn new(
        symbol: &str,
        exchange: Exchange,
        price: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, SkipReason> {
        let symbol = normalize_symbol(symbol);
        let sample = Self {
            symbol,
            exchange,
            price,
            observed_at,
        };
        sample.validate()?;
        Ok(sample)
    }

    /// Check the invariants a sample must hold to take part in a comparison
    pub fn validate(&self) -> Result<(), SkipReason> {
        if self.symbol.trim().is_empty() {
            return Err(SkipReason::EmptySymbol);
        }
        if !self.price.is_finite() {
            return Err(SkipReason::NonFinitePrice);
        }
        if self.price <= 0.0 {
            return Err(SkipReason::NonPositivePrice);
        }
        Ok(())
    }
}

pub(crate) fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Price difference for one symbol between two exchanges
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceComparison {
    pub symbol: String,
    pub exchange_a: Exchange,
    pub exchange_b: Exchange,
    pub price_a: f64,
    pub price_b: f64,
    /// |price_a - price_b|
    pub absolute_difference: f64,
    /// absolute_difference relative to the midpoint of both prices, in percent
    pub percentage_difference: f64,
    pub compared_at: DateTime<Utc>,
}

impl PriceComparison {
    /// Derive a comparison from two prices. Both prices must already be
    /// validated as strictly positive.
    pub fn from_prices(
        symbol: String,
        (exchange_a, price_a): (Exchange, f64),
        (exchange_b, price_b): (Exchange, f64),
        compared_at: DateTime<Utc>,
    ) -> Self {
        let absolute_difference = (price_a - price_b).abs();
        let midpoint = (price_a + price_b) / 2.0;
        let percentage_difference = absolute_difference / midpoint * 100.0;

        Self {
            symbol,
            exchange_a,
            exchange_b,
            price_a,
            price_b,
            absolute_difference,
            percentage_difference,
            compared_at,
        }
    }
}

/// Why a sample was left out of a comparison
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptySymbol,
    NonPositivePrice,
    NonFinitePrice,
    /// Sample was passed on the side of a different exchange
    WrongExchange,
    /// Symbol already seen on the same side of the batch
    DuplicateSymbol,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SkipReason::EmptySymbol => "empty symbol",
            SkipReason::NonPositivePrice => "non-positive price",
            SkipReason::NonFinitePrice => "non-finite price",
            SkipReason::WrongExchange => "sample belongs to another exchange",
            SkipReason::DuplicateSymbol => "duplicate symbol",
        };
        f.write_str(reason)
    }
}

/// A sample that was excluded from comparison
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedSample {
    pub symbol: String,
    pub exchange: Exchange,
    pub price: f64,
    pub reason: SkipReason,
}

/// Newest stored price for a (symbol, exchange) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestPrice {
    pub symbol: String,
    pub exchange: Exchange,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-exchange summary of stored samples
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExchangeStats {
    /// Distinct symbols ever observed on the exchange
    pub pair_count: usize,
    /// Timestamp of the most recent sample
    pub last_updated: DateTime<Utc>,
}

/// A symbol quoted on more than one exchange, with each exchange's latest price
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommonSymbol {
    pub symbol: String,
    pub prices: Vec<LatestPrice>,
}
