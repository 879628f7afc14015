use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::MarketConfig;
use crate::error::ApiError;

/// Public snapshot of one coin from the `coins/markets` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketTicker {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub image: String,
    pub current_price: f64,
    #[serde(default, rename = "price_change_percentage_1h_in_currency")]
    pub pct_change_1h: Option<f64>,
    #[serde(default, rename = "price_change_percentage_24h")]
    pub pct_change_24h: Option<f64>,
    #[serde(default, rename = "price_change_percentage_7d_in_currency")]
    pub pct_change_7d: Option<f64>,
    pub market_cap: f64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Colouring of a percentage cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Positive,
    NonPositive,
}

impl Trend {
    /// Only a strictly positive change is `Positive`; zero and missing are not.
    pub fn of(change: Option<f64>) -> Self {
        match change {
            Some(c) if c > 0.0 => Trend::Positive,
            _ => Trend::NonPositive,
        }
    }
}

/// Source of market snapshots so tests can inject a mock.
#[async_trait]
pub trait MarketFetcher: Send + Sync {
    async fn top_coins(&self) -> Result<Vec<MarketTicker>, ApiError>;
}

pub struct CoinGeckoFetcher {
    client: Client,
    base: String,
    vs_currency: String,
    per_page: u32,
}

impl CoinGeckoFetcher {
    pub fn new(config: &MarketConfig, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base: config.url.trim_end_matches('/').to_string(),
            vs_currency: config.vs_currency.clone(),
            per_page: config.per_page,
        })
    }
}

#[async_trait]
impl MarketFetcher for CoinGeckoFetcher {
    async fn top_coins(&self) -> Result<Vec<MarketTicker>, ApiError> {
        let url = format!("{}/coins/markets", self.base);
        let per_page = self.per_page.to_string();
        tracing::info!("fetching top {per_page} coins in {}", self.vs_currency);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", self.vs_currency.as_str()),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", "1"),
                ("price_change_percentage", "1h,24h,7d"),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            tracing::error!("market request failed with {status}");
            return Err(ApiError::status(status, format!("market data unavailable ({status})")));
        }
        let bytes = resp.bytes().await?;
        let coins: Vec<MarketTicker> =
            serde_json::from_slice(&bytes).map_err(|e| ApiError::malformed("/coins/markets", e))?;
        tracing::info!("received {} coins", coins.len());
        Ok(coins)
    }
}
