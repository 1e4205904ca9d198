//! Dashboard figures computed from a list of transactions.
//!
//! These feed the balance header and the per-category pie charts; rendering
//! is left to the UI.

use std::collections::HashMap;

use chrono::Datelike;

use crate::models::{Category, Transaction, TransactionKind};

/// Label used for transactions without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Balance {
    pub income: f64,
    pub expenses: f64,
}

impl Balance {
    pub fn net(&self) -> f64 {
        self.income - self.expenses
    }
}

/// One slice of a category pie chart.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category_id: Option<i64>,
    pub name: String,
    pub total: f64,
    /// Share of the chart, 0.0 to 100.0
    pub percent: f64,
}

pub fn balance(transactions: &[Transaction]) -> Balance {
    transactions
        .iter()
        .fold(Balance::default(), |mut acc, t| {
            match t.kind {
                TransactionKind::Income => acc.income += t.amount,
                TransactionKind::Expense => acc.expenses += t.amount,
            }
            acc
        })
}

/// Totals per category for one kind of transaction, largest first.
///
/// Transactions pointing at a category that no longer exists are counted as
/// uncategorized.
pub fn category_breakdown(
    transactions: &[Transaction],
    categories: &[Category],
    kind: TransactionKind,
) -> Vec<CategoryTotal> {
    let names: HashMap<i64, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();

    let mut totals: HashMap<Option<i64>, f64> = HashMap::new();
    for t in transactions.iter().filter(|t| t.kind == kind) {
        let key = t.category.filter(|id| names.contains_key(id));
        *totals.entry(key).or_insert(0.0) += t.amount;
    }

    let grand_total: f64 = totals.values().sum();
    let mut slices: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category_id, total)| CategoryTotal {
            category_id,
            name: category_id
                .and_then(|id| names.get(&id).copied())
                .unwrap_or(UNCATEGORIZED)
                .to_string(),
            total,
            percent: if grand_total > 0.0 {
                total / grand_total * 100.0
            } else {
                0.0
            },
        })
        .collect();

    slices.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    slices
}

pub fn filter_by_month(transactions: &[Transaction], year: i32, month: u32) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|t| t.date.year() == year && t.date.month() == month)
        .cloned()
        .collect()
}
