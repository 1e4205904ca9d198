//! Session ownership and credential storage.
//!
//! This module provides:
//! - `SessionManager`: the authenticated request pipeline with single-flight
//!   token refresh
//! - `CredentialStore`: durable token storage (OS keychain, JSON file, memory)
//! - `TokenRefresher`: the refresh-token exchange
//!
//! Only the session manager writes tokens; everything else reads through it.

pub mod credentials;
pub mod manager;
pub mod refresher;
pub mod session;

pub use credentials::{
    CredentialStore, FileStore, KeyringStore, MemoryStore, StorageError, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};
pub use manager::{RefreshState, SessionManager};
pub use refresher::{HttpTokenRefresher, RefreshError, RefreshedTokens, TokenRefresher};
pub use session::Session;
