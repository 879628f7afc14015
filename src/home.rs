use tracing::{info, warn};

use crate::error::{ApiError, LoadError};
use crate::holdings::HoldingsApi;
use crate::market::{MarketTicker, Trend};
use crate::router::Route;
use crate::state::AppContext;

/// One rendered line of the market table.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerRow {
    pub rank: usize,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub price: f64,
    pub change_1h: Option<f64>,
    pub change_24h: Option<f64>,
    pub change_7d: Option<f64>,
    pub market_cap: f64,
}

impl TickerRow {
    fn from_ticker(rank: usize, t: &MarketTicker) -> Self {
        Self {
            rank,
            name: t.name.clone(),
            symbol: t.symbol.to_uppercase(),
            image: t.image.clone(),
            price: t.current_price,
            change_1h: t.pct_change_1h,
            change_24h: t.pct_change_24h,
            change_7d: t.pct_change_7d,
            market_cap: t.market_cap,
        }
    }

    pub fn trend_1h(&self) -> Trend {
        Trend::of(self.change_1h)
    }

    pub fn trend_24h(&self) -> Trend {
        Trend::of(self.change_24h)
    }

    pub fn trend_7d(&self) -> Trend {
        Trend::of(self.change_7d)
    }
}

/// View-model behind the landing screen: portfolio value plus live market.
pub struct Home {
    ctx: AppContext,
    holdings: HoldingsApi,
    portfolio_value: Option<f64>,
    tickers: Vec<MarketTicker>,
    greeting: Option<String>,
    loading: bool,
}

impl Home {
    pub fn new(ctx: AppContext) -> Self {
        let holdings = HoldingsApi::new(ctx.api.clone());
        Self { ctx, holdings, portfolio_value: None, tickers: Vec::new(), greeting: None, loading: true }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn portfolio_value(&self) -> Option<f64> {
        self.portfolio_value
    }

    pub fn display_name(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    pub fn rows(&self) -> Vec<TickerRow> {
        self.tickers
            .iter()
            .enumerate()
            .map(|(i, t)| TickerRow::from_ticker(i + 1, t))
            .collect()
    }

    /// Fetch portfolio value and market snapshot together. Whatever arrived
    /// is kept even when the other half fails.
    pub async fn load(&mut self) -> Result<(), LoadError> {
        self.loading = true;
        self.greeting = self.ctx.session.display_name().await;
        let (stats, market) = tokio::join!(self.holdings.stats(), self.ctx.market.top_coins());

        let mut failures = Vec::new();
        match stats {
            Ok(s) => self.portfolio_value = Some(s.total_value),
            Err(e) => failures.push(("portfolio", e)),
        }
        match market {
            Ok(coins) => self.tickers = coins,
            Err(e) => failures.push(("market", e)),
        }
        self.loading = false;

        if failures.is_empty() {
            info!(coins = self.tickers.len(), "home loaded");
            return Ok(());
        }
        let err = LoadError { failures };
        warn!(summary = %err.summary(), "home load incomplete");
        self.ctx.notifier.error(err.summary()).await;
        Err(err)
    }

    pub async fn add_funds(&self) -> Route {
        self.ctx.navigator.navigate(Route::Dashboard).await
    }

    pub async fn logout(&mut self) -> Result<Route, ApiError> {
        self.portfolio_value = None;
        self.greeting = None;
        self.ctx.logout().await
    }
}
