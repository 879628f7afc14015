use tracing::{info, warn};

use crate::error::{ApiError, LoadError};
use crate::holdings::{parse_positive, Holding, HoldingsApi, NewHolding};
use crate::portfolio::PortfolioStats;
use crate::router::Route;
use crate::state::AppContext;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Loading,
    Ready,
    Failed(String),
}

/// Row currently being edited and its unsaved quantity input.
#[derive(Debug, Clone, PartialEq)]
pub struct EditBuffer {
    pub id: String,
    pub quantity: String,
}

/// View-model behind the holdings screen.
pub struct Dashboard {
    ctx: AppContext,
    api: HoldingsApi,
    holdings: Vec<Holding>,
    stats: Option<PortfolioStats>,
    state: ViewState,
    edit: Option<EditBuffer>,
}

impl Dashboard {
    pub fn new(ctx: AppContext) -> Self {
        let api = HoldingsApi::new(ctx.api.clone());
        Self { ctx, api, holdings: Vec::new(), stats: None, state: ViewState::Loading, edit: None }
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn stats(&self) -> Option<&PortfolioStats> {
        self.stats.as_ref()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn editing(&self) -> Option<&EditBuffer> {
        self.edit.as_ref()
    }

    async fn fail(&self, err: ApiError) -> ApiError {
        self.ctx.notifier.error(err.user_message()).await;
        err
    }

    /// Fetch holdings and stats together; resolves once both are back.
    pub async fn load(&mut self) -> Result<(), LoadError> {
        self.state = ViewState::Loading;
        let (holdings, stats) = tokio::join!(self.api.list(), self.api.stats());

        let mut failures = Vec::new();
        match holdings {
            Ok(h) => self.holdings = h,
            Err(e) => failures.push(("holdings", e)),
        }
        match stats {
            Ok(s) => self.stats = Some(s),
            Err(e) => failures.push(("stats", e)),
        }

        if failures.is_empty() {
            info!(count = self.holdings.len(), "dashboard loaded");
            self.state = ViewState::Ready;
            return Ok(());
        }
        let err = LoadError { failures };
        let summary = err.summary();
        warn!(%summary, "dashboard load failed");
        self.ctx.notifier.error(summary.clone()).await;
        self.state = ViewState::Failed(summary);
        Err(err)
    }

    /// Create a holding from raw form input and append the server's record.
    pub async fn add(&mut self, coin_name: &str, quantity: &str, buy_price: &str) -> Result<&Holding, ApiError> {
        let new = match NewHolding::parse(coin_name, quantity, buy_price) {
            Ok(new) => new,
            Err(e) => return Err(self.fail(e).await),
        };
        match self.api.add(&new).await {
            Ok(created) => {
                self.ctx.notifier.success(format!("Added {}", created.coin_name)).await;
                self.holdings.push(created);
                Ok(&self.holdings[self.holdings.len() - 1])
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Only one row is editable at a time; starting another drops the first.
    pub fn begin_edit(&mut self, id: &str) -> Result<(), ApiError> {
        let holding = self
            .holdings
            .iter()
            .find(|h| h.id == id)
            .ok_or_else(|| ApiError::validation(format!("no holding with id {id}")))?;
        self.edit = Some(EditBuffer { id: holding.id.clone(), quantity: holding.quantity.to_string() });
        Ok(())
    }

    pub fn set_edit_quantity(&mut self, quantity: impl Into<String>) {
        if let Some(edit) = self.edit.as_mut() {
            edit.quantity = quantity.into();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    /// Saves the edited quantity, then reloads holdings and stats once.
    pub async fn save_edit(&mut self) -> Result<(), ApiError> {
        let Some(edit) = self.edit.clone() else {
            return Err(self.fail(ApiError::validation("no holding is being edited")).await);
        };
        let quantity = match parse_positive("quantity", &edit.quantity) {
            Ok(q) => q,
            Err(e) => return Err(self.fail(e).await),
        };
        if let Err(e) = self.api.update_quantity(&edit.id, quantity).await {
            return Err(self.fail(e).await);
        }
        self.edit = None;
        self.ctx.notifier.success("Quantity updated").await;
        self.load().await?;
        Ok(())
    }

    /// Delete on the server, then drop exactly that row locally.
    pub async fn delete(&mut self, id: &str) -> Result<(), ApiError> {
        if let Err(e) = self.api.delete(id).await {
            warn!(id, "delete failed: {e}");
            self.ctx.notifier.error("Failed to delete holding").await;
            return Err(e);
        }
        self.holdings.retain(|h| h.id != id);
        if self.edit.as_ref().is_some_and(|e| e.id == id) {
            self.edit = None;
        }
        Ok(())
    }

    pub async fn go_home(&self) -> Route {
        self.ctx.navigator.navigate(Route::Home).await
    }

    pub async fn logout(&mut self) -> Result<Route, ApiError> {
        self.holdings.clear();
        self.stats = None;
        self.edit = None;
        self.ctx.logout().await
    }
}
