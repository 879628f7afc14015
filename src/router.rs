use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no screen at {0}")]
pub struct RouteError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    Signup,
    Dashboard,
    Home,
}

impl Route {
    pub const ALL: [Route; 5] = [Route::Root, Route::Login, Route::Signup, Route::Dashboard, Route::Home];

    pub fn path(self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Dashboard => "/dashboard",
            Route::Home => "/home",
        }
    }

    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let trimmed = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        Self::ALL
            .into_iter()
            .find(|r| r.path() == trimmed)
            .ok_or_else(|| RouteError(path.to_string()))
    }

    /// The screen actually shown for this route. Only the root redirects.
    pub fn resolve(self) -> Self {
        match self {
            Route::Root => Route::Login,
            other => other,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Tracks the current screen.
#[derive(Clone)]
pub struct Navigator {
    current: Arc<RwLock<Route>>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Root)
    }
}

impl Navigator {
    pub fn new(start: Route) -> Self {
        Self { current: Arc::new(RwLock::new(start.resolve())) }
    }

    pub async fn current(&self) -> Route {
        *self.current.read().await
    }

    pub async fn navigate(&self, route: Route) -> Route {
        let target = route.resolve();
        let mut current = self.current.write().await;
        info!(from = %*current, to = %target, "navigate");
        *current = target;
        target
    }

    pub async fn navigate_to_path(&self, path: &str) -> Result<Route, RouteError> {
        let route = Route::parse(path)?;
        Ok(self.navigate(route).await)
    }

    pub async fn navigate_after(&self, route: Route, delay: Duration) -> Route {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.navigate(route).await
    }
}
