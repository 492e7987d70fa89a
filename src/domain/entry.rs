use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, CustomerId, VisitId};

pub type EntryId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Credit added by hand
    Deposit,
    /// Credit removed by hand
    Withdrawal,
    /// Amount billed for a visit after credit and discount
    FeeCharge,
    /// Credit that offset a visit fee
    CreditApplied,
    /// First-visit credit granted
    CreditEarned,
    /// Credit consumed beyond the fee it offset
    CreditForfeited,
    /// Tip left with feedback
    Tip,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Deposit => "deposit",
            EntryKind::Withdrawal => "withdrawal",
            EntryKind::FeeCharge => "fee_charge",
            EntryKind::CreditApplied => "credit_applied",
            EntryKind::CreditEarned => "credit_earned",
            EntryKind::CreditForfeited => "credit_forfeited",
            EntryKind::Tip => "tip",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(EntryKind::Deposit),
            "withdrawal" => Some(EntryKind::Withdrawal),
            "fee_charge" => Some(EntryKind::FeeCharge),
            "credit_applied" => Some(EntryKind::CreditApplied),
            "credit_earned" => Some(EntryKind::CreditEarned),
            "credit_forfeited" => Some(EntryKind::CreditForfeited),
            "tip" => Some(EntryKind::Tip),
            _ => None,
        }
    }

    /// Signed effect of this entry on the customer's credit balance.
    pub fn credit_effect(&self, amount_cents: Cents) -> Cents {
        match self {
            EntryKind::Deposit | EntryKind::CreditEarned => amount_cents,
            EntryKind::Withdrawal | EntryKind::CreditApplied | EntryKind::CreditForfeited => {
                -amount_cents
            }
            EntryKind::FeeCharge | EntryKind::Tip => 0,
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable record of one monetary movement for a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    /// Monotonically increasing, assigned by storage
    pub sequence: i64,
    pub customer_id: CustomerId,
    pub kind: EntryKind,
    /// Always positive
    pub amount_cents: Cents,
    /// Visit that produced this entry, if any
    pub visit_id: Option<VisitId>,
    pub description: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Returns `None` for a non-positive amount: zero movements are not recorded.
    pub fn new(customer_id: CustomerId, kind: EntryKind, amount_cents: Cents) -> Option<Self> {
        if amount_cents <= 0 {
            return None;
        }
        Some(Self {
            id: Uuid::new_v4(),
            sequence: 0,
            customer_id,
            kind,
            amount_cents,
            visit_id: None,
            description: None,
            recorded_at: Utc::now(),
        })
    }

    pub fn with_visit(mut self, visit_id: VisitId) -> Self {
        self.visit_id = Some(visit_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn credit_effect(&self) -> Cents {
        self.kind.credit_effect(self.amount_cents)
    }
}

/// Replay entries to recover a credit balance. Used by integrity checks.
pub fn replay_credit_balance<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Cents {
    entries.into_iter().map(LedgerEntry::credit_effect).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_roundtrip() {
        for kind in [
            EntryKind::Deposit,
            EntryKind::Withdrawal,
            EntryKind::FeeCharge,
            EntryKind::CreditApplied,
            EntryKind::CreditEarned,
            EntryKind::CreditForfeited,
            EntryKind::Tip,
        ] {
            assert_eq!(EntryKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(EntryKind::from_str("refund"), None);
    }

    #[test]
    fn test_zero_amount_is_not_recorded() {
        let customer = Uuid::new_v4();
        assert!(LedgerEntry::new(customer, EntryKind::FeeCharge, 0).is_none());
        assert!(LedgerEntry::new(customer, EntryKind::FeeCharge, -10).is_none());
    }

    #[test]
    fn test_replay_credit_balance() {
        let customer = Uuid::new_v4();
        let entries: Vec<LedgerEntry> = [
            (EntryKind::CreditEarned, 2000),
            (EntryKind::FeeCharge, 5000),
            (EntryKind::Deposit, 1000),
            (EntryKind::CreditApplied, 1500),
            (EntryKind::CreditForfeited, 1500),
            (EntryKind::Tip, 300),
        ]
        .into_iter()
        .filter_map(|(kind, amount)| LedgerEntry::new(customer, kind, amount))
        .collect();

        assert_eq!(replay_credit_balance(&entries), 0);
    }
}
