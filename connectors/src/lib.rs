pub mod hyperliquid;
pub mod lighter;

use async_trait::async_trait;
use chrono::Utc;
use common::{
    models::{Exchange, PriceSample},
    Error, Result,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout applied to every exchange request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A raw (symbol, price) pair as reported by an exchange
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
}

/// Trait defining the interface for exchange API clients
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    /// The exchange this connector talks to
    fn exchange(&self) -> Exchange;

    /// Fetch the current symbol -> price mapping in the exchange's own shape
    async fn fetch_quotes(&self) -> Result<Vec<Quote>>;

    /// Fetch current prices as validated samples.
    ///
    /// Quotes that fail validation are logged and dropped here, so callers
    /// only ever see well-formed samples.
    async fn fetch_samples(&self) -> Result<Vec<PriceSample>> {
        let exchange = self.exchange();
        let quotes = self.fetch_quotes().await?;
        let observed_at = Utc::now();

        let total = quotes.len();
        let samples: Vec<PriceSample> = quotes
            .into_iter()
            .filter_map(|quote| {
                match PriceSample::new(&quote.symbol, exchange, quote.price, observed_at) {
                    Ok(sample) => Some(sample),
                    Err(reason) => {
                        warn!(
                            "Dropping {} quote {:?} (price {}): {}",
                            exchange, quote.symbol, quote.price, reason
                        );
                        None
                    }
                }
            })
            .collect();

        debug!("{}: {} of {} quotes valid", exchange, samples.len(), total);
        Ok(samples)
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(Error::HttpError)
}

/// Turn a non-success HTTP response into an `ExchangeError`
pub(crate) async fn check_status(
    exchange: Exchange,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    tracing::error!("{} API error: {} - {}", exchange, status, error_text);
    Err(Error::ExchangeError(format!(
        "{} API error: {} - {}",
        exchange, status, error_text
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticConnector(Vec<Quote>);

    #[async_trait]
    impl ExchangeConnector for StaticConnector {
        fn exchange(&self) -> Exchange {
            Exchange::Lighter
        }

        async fn fetch_quotes(&self) -> Result<Vec<Quote>> {
            Ok(self.0.clone())
        }
    }

    fn quote(symbol: &str, price: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            price,
        }
    }

    #[tokio::test]
    async fn fetch_samples_validates_at_the_boundary() {
        let connector = StaticConnector(vec![
            quote(" btc", 50000.0),
            quote("", 1.0),
            quote("ZERO", 0.0),
            quote("eth", 3000.0),
        ]);

        let samples = connector.fetch_samples().await.unwrap();

        let symbols: Vec<&str> = samples.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH"]);
        assert!(samples.iter().all(|s| s.exchange == Exchange::Lighter));
        assert_eq!(samples[0].observed_at, samples[1].observed_at);
    }
}
