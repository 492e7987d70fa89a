use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type CustomerId = Uuid;

/// A billed customer with a running loyalty credit balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Contact number, unique per customer
    pub phone: String,
    pub address: Option<String>,
    /// Promotional credit, never negative
    pub credit_balance: Cents,
    /// Completed visits, never decreases
    pub visit_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            phone: phone.into(),
            address: None,
            credit_balance: 0,
            visit_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn is_returning(&self) -> bool {
        self.visit_count > 0
    }
}

/// A phone number is 10 to 12 ASCII digits.
pub fn is_valid_phone(phone: &str) -> bool {
    (10..=12).contains(&phone.len()) && phone.chars().all(|c| c.is_ascii_digit())
}
