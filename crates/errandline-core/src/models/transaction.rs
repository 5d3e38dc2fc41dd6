use serde::{Deserialize, Serialize};

use super::de;

/// One entry in a vendor's or dispatcher's payment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "de::opt_amount")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub account_number: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub vendor_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub dispatcher_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Transaction {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("Wallet Withdrawal")
    }

    /// Bank name without the parenthesized brand, e.g.
    /// `"Wema Bank Plc (ALAT by Wema)"` becomes `"Wema Bank Plc"`.
    pub fn bank_display(&self) -> Option<&str> {
        self.bank_name
            .as_deref()
            .map(|name| name.split('(').next().unwrap_or(name).trim())
    }

    pub fn is_successful(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("successful") || s.eq_ignore_ascii_case("success"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transaction() {
        let json = r#"{
            "id": 8,
            "dispatcher_id": null,
            "vendor_id": 1,
            "amount": "6000.00",
            "bank_name": "Wema Bank Plc (ALAT by Wema)",
            "account_number": "0112345678",
            "account_name": "Tunde Bakare",
            "status": "pending",
            "created_at": "2024-12-05T08:30:00.000000Z",
            "updated_at": "2024-12-05T08:30:00.000000Z"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.amount, Some(6000.0));
        assert_eq!(tx.vendor_id, Some(1));
        assert_eq!(tx.dispatcher_id, None);
        assert_eq!(tx.bank_display(), Some("Wema Bank Plc"));
        assert_eq!(tx.title(), "Wallet Withdrawal");
        assert!(!tx.is_successful());
    }
}
