use crate::{check_status, http_client, ExchangeConnector, Quote, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use common::{models::Exchange, Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const LIGHTER_API_URL: &str = "https://mainnet.zklighter.elliot.ai/api/v1";

pub struct LighterConnector {
    client: reqwest::Client,
    base_url: String,
}

impl LighterConnector {
    pub fn new() -> Result<Self> {
        Self::with_base_url(LIGHTER_API_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderBookDetailsResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub order_book_details: Vec<LighterMarket>,
}

#[derive(Debug, Deserialize)]
pub struct LighterMarket {
    #[serde(default)]
    pub symbol: String,
    /// Number or numeric string depending on API version
    #[serde(default)]
    pub last_trade_price: Option<Value>,
}

fn price_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Map an `orderBookDetails` payload into quotes.
///
/// Lighter signals failures in-band through `code`, so anything other than
/// 200 is an error even on an HTTP 200 response.
pub fn quotes_from_details(details: OrderBookDetailsResponse) -> Result<Vec<Quote>> {
    if details.code != 200 {
        return Err(Error::ExchangeError(format!(
            "Lighter API error: code {} - {}",
            details.code,
            details.message.as_deref().unwrap_or("Unknown error")
        )));
    }

    let quotes = details
        .order_book_details
        .into_iter()
        .filter_map(|market| {
            let raw = market.last_trade_price.as_ref()?;
            match price_value(raw) {
                Some(price) => Some(Quote {
                    symbol: market.symbol,
                    price,
                }),
                None => {
                    warn!("Bad Lighter price for {:?}: {}", market.symbol, raw);
                    None
                }
            }
        })
        .collect();

    Ok(quotes)
}

#[async_trait]
impl ExchangeConnector for LighterConnector {
    fn exchange(&self) -> Exchange {
        Exchange::Lighter
    }

    async fn fetch_quotes(&self) -> Result<Vec<Quote>> {
        let url = format!("{}/orderBookDetails", self.base_url);

        debug!("Fetching order book details from Lighter: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Error::HttpError)?;

        let response = check_status(Exchange::Lighter, response).await?;

        let details: OrderBookDetailsResponse = response.json().await.map_err(|e| {
            Error::ParseError(format!("Failed to parse Lighter response: {}", e))
        })?;

        debug!(
            "Lighter returned {} markets",
            details.order_book_details.len()
        );

        quotes_from_details(details)
    }
}
