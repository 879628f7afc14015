use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::router::Route;
use crate::state::AppContext;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LoginInfo {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SignupInfo {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
struct LoginReply {
    #[serde(default, rename = "jwtToken")]
    jwt_token: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    /// Accepting input, with the message of the last failure if any.
    Editing(Option<String>),
    Submitting,
    Succeeded(Route),
}

impl Default for FormState {
    fn default() -> Self {
        FormState::Editing(None)
    }
}

async fn reject(ctx: &AppContext, state: &mut FormState, err: ApiError, shown: String) -> ApiError {
    ctx.notifier.error(shown.clone()).await;
    *state = FormState::Editing(Some(shown));
    err
}

async fn finish(ctx: &AppContext, state: &mut FormState, message: Option<String>, fallback: &str, next: Route) -> Route {
    ctx.notifier.success(message.unwrap_or_else(|| fallback.to_string())).await;
    *state = FormState::Succeeded(next);
    ctx.navigator.navigate_after(next, ctx.config.navigation_delay()).await
}

pub struct LoginForm {
    ctx: AppContext,
    pub info: LoginInfo,
    state: FormState,
}

impl LoginForm {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx, info: LoginInfo::default(), state: FormState::default() }
    }

    pub fn with_credentials(ctx: AppContext, email: impl Into<String>, password: impl Into<String>) -> Self {
        let mut form = Self::new(ctx);
        form.info = LoginInfo { email: email.into(), password: password.into() };
        form
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Stores the session and moves to the home screen on success.
    pub async fn submit(&mut self) -> Result<Route, ApiError> {
        if self.info.email.is_empty() || self.info.password.is_empty() {
            let message = "Email and password are required".to_string();
            return Err(reject(&self.ctx, &mut self.state, ApiError::validation(&message), message).await);
        }

        self.state = FormState::Submitting;
        let reply = self.ctx.api.send_envelope::<_, LoginReply>("/auth/login", &self.info).await;
        let envelope = match reply {
            Ok(env) => env,
            Err(e) => {
                warn!(email = %self.info.email, "login request failed: {e}");
                let shown = "Something went wrong. Please try again.".to_string();
                return Err(reject(&self.ctx, &mut self.state, e, shown).await);
            }
        };

        if !envelope.success {
            let shown = envelope.failure_message("Login failed");
            info!(email = %self.info.email, "login rejected");
            return Err(reject(&self.ctx, &mut self.state, ApiError::Rejected(shown.clone()), shown).await);
        }

        let Some(token) = envelope.data.jwt_token.filter(|t| !t.is_empty()) else {
            let err = ApiError::malformed("/auth/login", "successful login without jwtToken");
            let shown = err.user_message();
            return Err(reject(&self.ctx, &mut self.state, err, shown).await);
        };
        let name = envelope.data.name.unwrap_or_default();
        if let Err(e) = self.ctx.session.set_session(&token, &name).await {
            let err = ApiError::from(e);
            let shown = err.user_message();
            return Err(reject(&self.ctx, &mut self.state, err, shown).await);
        }
        info!(email = %self.info.email, "logged in");
        Ok(finish(&self.ctx, &mut self.state, envelope.message, "Login successful", Route::Home).await)
    }
}

pub struct SignupForm {
    ctx: AppContext,
    pub info: SignupInfo,
    state: FormState,
}

impl SignupForm {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx, info: SignupInfo::default(), state: FormState::default() }
    }

    pub fn with_details(
        ctx: AppContext,
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let mut form = Self::new(ctx);
        form.info = SignupInfo { username: username.into(), email: email.into(), password: password.into() };
        form
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Registers the account and moves to the login screen on success.
    pub async fn submit(&mut self) -> Result<Route, ApiError> {
        let SignupInfo { username, email, password } = &self.info;
        if username.is_empty() || email.is_empty() || password.is_empty() {
            let message = "Name, email, and password are required.".to_string();
            return Err(reject(&self.ctx, &mut self.state, ApiError::validation(&message), message).await);
        }

        self.state = FormState::Submitting;
        let envelope = match self.ctx.api.send_envelope::<_, serde_json::Value>("/auth/signup", &self.info).await {
            Ok(env) => env,
            Err(e) => {
                warn!(email = %self.info.email, "signup request failed: {e}");
                let shown = "An unexpected error occurred.".to_string();
                return Err(reject(&self.ctx, &mut self.state, e, shown).await);
            }
        };

        if !envelope.success {
            let shown = envelope.failure_message("Signup failed.");
            return Err(reject(&self.ctx, &mut self.state, ApiError::Rejected(shown.clone()), shown).await);
        }
        info!(email = %self.info.email, "signed up");
        Ok(finish(&self.ctx, &mut self.state, envelope.message, "Signup successful", Route::Login).await)
    }
}
