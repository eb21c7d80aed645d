use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

/// A Paystack purchase attempt, idempotent per `reference`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: String,
    /// Our reference handed to Paystack at initialization; unique.
    pub reference: String,
    pub user_id: String,
    pub plan_id: String,
    /// Amount in the smallest currency unit (kobo).
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    /// Paystack's numeric transaction id, set on reconciliation.
    pub provider_transaction_id: Option<i64>,
    pub channel: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Transaction {
    pub fn pending(reference: &str, user_id: &str, plan_id: &str, amount: i64, currency: &str) -> Self {
        let now = DateTime::now();
        Self {
            id: Uuid::new_v4().to_string(),
            reference: reference.to_string(),
            user_id: user_id.to_string(),
            plan_id: plan_id.to_string(),
            amount,
            currency: currency.to_string(),
            status: TransactionStatus::Pending,
            provider_transaction_id: None,
            channel: None,
            created_at: now,
            updated_at: now,
        }
    }
}
