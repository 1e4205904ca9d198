//! Client core for the budgetbook personal-finance app.
//!
//! Screens call into [`api::FinanceApi`]; every request it makes goes through
//! the shared [`auth::SessionManager`], which attaches the bearer token,
//! renews it once when the backend rejects it, and ends the session when it
//! cannot be renewed.

pub mod api;
pub mod auth;
pub mod config;
pub mod logging;
pub mod models;
pub mod summaries;

pub use api::{ApiError, FinanceApi, RequestSpec, SessionError};
pub use auth::SessionManager;
pub use config::Config;
