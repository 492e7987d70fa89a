use anyhow::Result;

use crate::domain::{Cents, Customer, CustomerId, Feedback, LedgerEntry, VisitEvent};

/// Persistence collaborator for the ledger service.
///
/// Every write method is all-or-nothing: when it returns an error, none of
/// its records are stored and the customer row is unchanged. Writes that
/// touch a customer must fail when the customer does not exist.
#[allow(async_fn_in_trait)]
pub trait CustomerStore {
    async fn create_customer(&self, customer: &Customer) -> Result<()>;

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    async fn find_customer_by_phone(&self, phone: &str) -> Result<Option<Customer>>;

    async fn list_customers(&self) -> Result<Vec<Customer>>;

    /// Store a processed visit: the visit record, its ledger entries
    /// (sequence numbers assigned here) and the visit's customer with its
    /// new credit balance and visit count. This is the only customer write
    /// a visit makes.
    async fn record_visit(
        &self,
        visit: &VisitEvent,
        entries: &mut [LedgerEntry],
        credit_balance: Cents,
        visit_count: i64,
    ) -> Result<()>;

    /// Append a credit movement and set the entry's customer to the new
    /// balance. The visit count is left alone.
    async fn record_credit_change(&self, entry: &mut LedgerEntry, credit_balance: Cents)
    -> Result<()>;

    /// All entries, ordered by sequence.
    async fn list_entries(&self) -> Result<Vec<LedgerEntry>>;

    async fn list_entries_for_customer(&self, id: CustomerId) -> Result<Vec<LedgerEntry>>;

    /// All visits, oldest first.
    async fn list_visits(&self) -> Result<Vec<VisitEvent>>;

    async fn list_visits_for_customer(&self, id: CustomerId) -> Result<Vec<VisitEvent>>;

    /// Store a rating and, when the tip is positive, its `Tip` entry.
    async fn save_feedback(&self, feedback: &Feedback, tip: Option<&mut LedgerEntry>)
    -> Result<()>;

    async fn list_feedback_for_customer(&self, id: CustomerId) -> Result<Vec<Feedback>>;
}
