//! Client for the Cryptex portfolio tracker: session handling, the holdings
//! dashboard and the live market view, driven from the `cryptex` binary.

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod holdings;
pub mod home;
pub mod market;
pub mod notify;
pub mod portfolio;
pub mod render;
pub mod router;
pub mod session;
pub mod state;
