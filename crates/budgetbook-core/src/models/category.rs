use serde::{Deserialize, Serialize};

use super::TransactionKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: TransactionKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category() {
        let json = r#"{"id": 3, "name": "Groceries", "type": "expense"}"#;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category.kind, TransactionKind::Expense);

        // Older backends omit the type
        let json = r#"{"id": 4, "name": "Misc"}"#;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category.kind, TransactionKind::Expense);
    }

    #[test]
    fn test_new_category_body() {
        let body = serde_json::to_value(NewCategory {
            name: "Salary".into(),
            kind: TransactionKind::Income,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"name": "Salary", "type": "income"}));
    }
}
