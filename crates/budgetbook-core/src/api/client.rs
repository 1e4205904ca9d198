//! API client for the budgetbook REST backend.
//!
//! `FinanceApi` turns screen-level operations (list transactions, add a
//! category, log in) into `RequestSpec`s and runs them through the shared
//! `SessionManager`, so every call gets the same token handling.

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::auth::SessionManager;
use crate::models::{
    Category, Credentials, NewCategory, NewTransaction, Registration, TokenPair, Transaction,
};

use super::{RequestSpec, SessionError};

// ============================================================================
// Endpoints
// ============================================================================

const LOGIN_PATH: &str = "/api/token/";
const REGISTER_PATH: &str = "/api/register/";
const TRANSACTIONS_PATH: &str = "/api/transactions/";
const CATEGORIES_PATH: &str = "/api/categories/";

/// Typed client for the finance endpoints.
/// Clone is cheap - the session manager is shared.
#[derive(Clone)]
pub struct FinanceApi {
    session: SessionManager,
}

impl FinanceApi {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    async fn fetch<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T, SessionError> {
        let response = self.session.execute(spec).await?;
        Ok(response.json()?)
    }

    async fn send(&self, spec: RequestSpec) -> Result<(), SessionError> {
        self.session.execute(spec).await?;
        Ok(())
    }

    // ===== Account =====

    /// Exchange username and password for a token pair and start a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), SessionError> {
        let spec = RequestSpec::post(LOGIN_PATH)
            .json(&Credentials {
                username: username.to_string(),
                password: password.to_string(),
            })?
            .public();

        let tokens: TokenPair = self.fetch(spec).await?;
        self.session.login(tokens.access, tokens.refresh).await?;
        info!(username, "Logged in");
        Ok(())
    }

    pub async fn register(&self, registration: &Registration) -> Result<(), SessionError> {
        let spec = RequestSpec::post(REGISTER_PATH)
            .json(registration)?
            .public();
        self.send(spec).await?;
        info!(username = %registration.username, "Account registered");
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        self.session.logout().await
    }

    // ===== Transactions =====

    pub async fn transactions(&self) -> Result<Vec<Transaction>, SessionError> {
        let transactions: Vec<Transaction> = self.fetch(RequestSpec::get(TRANSACTIONS_PATH)).await?;
        debug!(count = transactions.len(), "Fetched transactions");
        Ok(transactions)
    }

    pub async fn create_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<Transaction, SessionError> {
        self.fetch(RequestSpec::post(TRANSACTIONS_PATH).json(transaction)?)
            .await
    }

    pub async fn update_transaction(
        &self,
        id: i64,
        transaction: &NewTransaction,
    ) -> Result<Transaction, SessionError> {
        let path = format!("{}{}/", TRANSACTIONS_PATH, id);
        self.fetch(RequestSpec::put(path).json(transaction)?).await
    }

    pub async fn delete_transaction(&self, id: i64) -> Result<(), SessionError> {
        self.send(RequestSpec::delete(format!("{}{}/", TRANSACTIONS_PATH, id)))
            .await
    }

    // ===== Categories =====

    pub async fn categories(&self) -> Result<Vec<Category>, SessionError> {
        self.fetch(RequestSpec::get(CATEGORIES_PATH)).await
    }

    pub async fn create_category(&self, category: &NewCategory) -> Result<Category, SessionError> {
        self.fetch(RequestSpec::post(CATEGORIES_PATH).json(category)?)
            .await
    }

    pub async fn delete_category(&self, id: i64) -> Result<(), SessionError> {
        self.send(RequestSpec::delete(format!("{}{}/", CATEGORIES_PATH, id)))
            .await
    }
}
