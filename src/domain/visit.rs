use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, CustomerId};

pub type VisitId = Uuid;

/// One billable service consumption. Immutable once created and stored with
/// the ledger entries it produced, which carry its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEvent {
    pub id: VisitId,
    pub customer_id: CustomerId,
    /// Normalized category name
    pub category: String,
    /// Units ordered or days parked
    pub quantity: i64,
    pub base_fee: Cents,
    /// What the customer paid after credit and discount
    pub fee_charged: Cents,
    pub occurred_at: DateTime<Utc>,
}

impl VisitEvent {
    pub fn new(
        customer_id: CustomerId,
        category: String,
        quantity: i64,
        base_fee: Cents,
        fee_charged: Cents,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            category,
            quantity,
            base_fee,
            fee_charged,
            occurred_at: Utc::now(),
        }
    }
}
