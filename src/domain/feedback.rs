use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, CustomerId};

pub type FeedbackId = Uuid;

pub const MAX_STARS: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub customer_id: CustomerId,
    /// 0 means no rating given
    pub stars: u8,
    pub tip: Cents,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(customer_id: CustomerId, stars: u8, tip: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            stars,
            tip,
            created_at: Utc::now(),
        }
    }

    pub fn message(&self) -> &'static str {
        match self.stars {
            4 | 5 => "Thank you! Very good maintenance.",
            3 => "Good maintenance.",
            2 => "Average maintenance.",
            1 => "Very bad maintenance.",
            0 => "No feedback given.",
            _ => "Invalid star rating.",
        }
    }
}
