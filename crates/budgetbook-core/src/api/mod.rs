//! REST API access for the budgetbook backend.
//!
//! This module provides the `FinanceApi` client for transactions,
//! categories and account management, plus the pieces it is built on:
//! `RequestSpec` describes a call, a `RequestExecutor` performs it, and the
//! session manager decides which token goes with it.
//!
//! The API uses JWT bearer token authentication; access tokens are renewed
//! through the refresh endpoint when the backend answers 401.

pub mod client;
pub mod error;
pub mod executor;
pub mod request;

pub use client::FinanceApi;
pub use error::{ApiError, SessionError};
pub use executor::{ExecOutcome, HttpExecutor, RequestExecutor, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use request::{ApiResponse, AuthMode, RequestSpec};
