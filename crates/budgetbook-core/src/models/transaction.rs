use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Income => write!(f, "Income"),
            TransactionKind::Expense => write!(f, "Expense"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    // Decimal fields arrive as strings ("12.50")
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
    #[serde(rename = "type", default)]
    pub kind: TransactionKind,
    pub category: Option<i64>,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
}

/// Body for creating or replacing a transaction.
#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: Option<i64>,
    pub description: String,
    pub date: NaiveDate,
}

impl From<&Transaction> for NewTransaction {
    fn from(t: &Transaction) -> Self {
        Self {
            amount: t.amount,
            kind: t.kind,
            category: t.category,
            description: t.description.clone(),
            date: t.date,
        }
    }
}

// Helper to deserialize a decimal given as string or number
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct AmountVisitor;

    impl<'de> de::Visitor<'de> for AmountVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number or numeric string")
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            v.trim()
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}
