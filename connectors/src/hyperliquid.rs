use crate::{check_status, http_client, ExchangeConnector, Quote, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use common::{models::Exchange, Error, Result};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

pub const HYPERLIQUID_API_URL: &str = "https://api.hyperliquid.xyz";

pub struct HyperliquidConnector {
    client: reqwest::Client,
    base_url: String,
}

impl HyperliquidConnector {
    pub fn new() -> Result<Self> {
        Self::with_base_url(HYPERLIQUID_API_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn info<T: DeserializeOwned>(&self, request_type: &str) -> Result<T> {
        let url = format!("{}/info", self.base_url);

        debug!("Requesting {} from Hyperliquid: {}", request_type, url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "type": request_type }))
            .send()
            .await
            .map_err(Error::HttpError)?;

        let response = check_status(Exchange::Hyperliquid, response).await?;

        response.json().await.map_err(|e| {
            Error::ParseError(format!(
                "Failed to parse Hyperliquid {} response: {}",
                request_type, e
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct HyperliquidMeta {
    pub universe: Vec<HyperliquidAsset>,
}

#[derive(Debug, Deserialize)]
pub struct HyperliquidAsset {
    pub name: String,
}

/// Join the perp universe with the mid-price map.
///
/// Assets without a mid price are left out; a mid that is not a number is
/// logged and left out.
pub fn quotes_from_meta(meta: &HyperliquidMeta, mids: &HashMap<String, String>) -> Vec<Quote> {
    meta.universe
        .iter()
        .filter(|asset| !asset.name.is_empty())
        .filter_map(|asset| {
            let mid = mids.get(&asset.name)?;
            match mid.parse::<f64>() {
                Ok(price) => Some(Quote {
                    symbol: asset.name.clone(),
                    price,
                }),
                Err(e) => {
                    warn!("Bad Hyperliquid mid for {}: {:?} ({})", asset.name, mid, e);
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl ExchangeConnector for HyperliquidConnector {
    fn exchange(&self) -> Exchange {
        Exchange::Hyperliquid
    }

    async fn fetch_quotes(&self) -> Result<Vec<Quote>> {
        let meta: HyperliquidMeta = self.info("meta").await?;
        let mids: HashMap<String, String> = self.info("allMids").await?;

        debug!(
            "Hyperliquid returned {} assets and {} mids",
            meta.universe.len(),
            mids.len()
        );

        Ok(quotes_from_meta(&meta, &mids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_universe_with_mids() {
        let meta: HyperliquidMeta = serde_json::from_str(
            r#"{"universe": [
                {"name": "BTC", "szDecimals": 5, "maxLeverage": 40},
                {"name": "ETH", "szDecimals": 4, "maxLeverage": 25},
                {"name": "DELISTED", "szDecimals": 0, "maxLeverage": 3, "isDelisted": true}
            ]}"#,
        )
        .unwrap();
        let mids: HashMap<String, String> = serde_json::from_str(
            r#"{"BTC": "50000.5", "ETH": "3000", "@107": "12.1"}"#,
        )
        .unwrap();

        let quotes = quotes_from_meta(&meta, &mids);

        assert_eq!(
            quotes,
            vec![
                Quote {
                    symbol: "BTC".to_string(),
                    price: 50000.5
                },
                Quote {
                    symbol: "ETH".to_string(),
                    price: 3000.0
                },
            ]
        );
    }

    #[test]
    fn unparseable_mid_is_dropped() {
        let meta: HyperliquidMeta =
            serde_json::from_str(r#"{"universe": [{"name": "BTC"}, {"name": "ETH"}]}"#).unwrap();
        let mids: HashMap<String, String> =
            serde_json::from_str(r#"{"BTC": "n/a", "ETH": "2999.9"}"#).unwrap();

        let quotes = quotes_from_meta(&meta, &mids);

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].symbol, "ETH");
    }

    #[test]
    fn base_url_is_normalized() {
        let connector =
            HyperliquidConnector::with_base_url("http://localhost:1/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(connector.base_url, "http://localhost:1");
        assert_eq!(connector.exchange(), Exchange::Hyperliquid);
    }
}
