//! Data models for budgetbook entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `Transaction`, `NewTransaction`: income and expense entries
//! - `Category`, `NewCategory`: user-defined groupings for transactions
//! - `TokenPair`, `Credentials`, `Registration`: account endpoints

pub mod account;
pub mod category;
pub mod transaction;

pub use account::{Credentials, Registration, TokenPair};
pub use category::{Category, NewCategory};
pub use transaction::{NewTransaction, Transaction, TransactionKind};
