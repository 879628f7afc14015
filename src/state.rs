use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::market::{CoinGeckoFetcher, MarketFetcher};
use crate::notify::Notifier;
use crate::router::{Navigator, Route};
use crate::session::{SessionBackend, SessionStore};

/// Everything a screen needs, passed in explicitly.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub session: SessionStore,
    pub api: ApiClient,
    pub market: Arc<dyn MarketFetcher>,
    pub notifier: Notifier,
    pub navigator: Navigator,
}

impl AppContext {
    pub fn new(
        config: Config,
        backend: Arc<dyn SessionBackend>,
        notifier: Notifier,
    ) -> Result<Self, ApiError> {
        let session = SessionStore::new(backend);
        let api = ApiClient::new(&config, session.clone())?;
        let market = Arc::new(CoinGeckoFetcher::new(&config.market, config.request_timeout())?);
        Ok(Self {
            config: Arc::new(config),
            session,
            api,
            market,
            notifier,
            navigator: Navigator::default(),
        })
    }

    /// Clears the session and returns to the login screen.
    pub async fn logout(&self) -> Result<Route, ApiError> {
        self.session.clear_session().await?;
        tracing::info!("logged out");
        Ok(self.navigator.navigate(Route::Login).await)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory session, zero navigation delay, backend at `url`.
    pub fn context(url: &str, market: Arc<dyn MarketFetcher>) -> AppContext {
        let config = Config {
            backend_url: url.to_string(),
            navigation_delay_ms: 0,
            ..Config::default()
        };
        let session = SessionStore::in_memory();
        AppContext {
            api: ApiClient::with_base(url, session.clone()),
            config: Arc::new(config),
            session,
            market,
            notifier: Notifier::new(),
            navigator: Navigator::default(),
        }
    }

    pub struct NoMarket;

    #[async_trait::async_trait]
    impl MarketFetcher for NoMarket {
        async fn top_coins(&self) -> Result<Vec<crate::market::MarketTicker>, ApiError> {
            Ok(Vec::new())
        }
    }
}
