// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use tempfile::TempDir;
use visitledger::application::LedgerService;
use visitledger::domain::{
    CategoryRate, Cents, CreditPolicy, Customer, CustomerId, Feedback, LedgerEntry, PricingTable,
    VisitEvent,
};
use visitledger::storage::CustomerStore;

/// Helper to create a SQLite-backed service in a temporary directory
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    test_service_with(PricingTable::default()).await
}

pub async fn test_service_with(pricing: PricingTable) -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap(), pricing).await?;
    Ok((service, temp_dir))
}

/// Canteen tariff: small 10.00 / medium 50.00 / large 100.00, credits 10/20/30.
pub fn canteen_pricing() -> PricingTable {
    PricingTable::new(
        [
            ("small", 1000, 1000),
            ("medium", 5000, 2000),
            ("large", 10000, 3000),
        ]
        .into_iter()
        .map(|(name, unit_price, first_visit_credit)| {
            (
                name.to_string(),
                CategoryRate {
                    unit_price,
                    first_visit_credit,
                },
            )
        }),
        CreditPolicy::PerCategory,
        0.10,
    )
    .unwrap()
}

/// In-memory store that records every write, for asserting call discipline.
///
/// Writes are staged and applied only when every part succeeds, matching the
/// all-or-nothing contract of the SQLite repository.
#[derive(Default)]
pub struct RecordingStore {
    customers: Mutex<BTreeMap<CustomerId, Customer>>,
    visits: Mutex<Vec<VisitEvent>>,
    entries: Mutex<Vec<LedgerEntry>>,
    feedback: Mutex<Vec<Feedback>>,
    pub customer_writes: AtomicUsize,
    /// Fail the nth entry of the next write (1-based); 0 never fails.
    pub fail_on_entry: AtomicUsize,
}

impl RecordingStore {
    /// Committed writes to a customer row.
    pub fn customer_write_count(&self) -> usize {
        self.customer_writes.load(Ordering::SeqCst)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn visit_count(&self) -> usize {
        self.visits.lock().unwrap().len()
    }

    pub fn fail_on_entry(&self, nth: usize) {
        self.fail_on_entry.store(nth, Ordering::SeqCst);
    }

    pub fn seed(&self, customer: Customer) {
        self.customers.lock().unwrap().insert(customer.id, customer);
    }

    /// Assign sequences to a batch, failing where configured. Nothing is
    /// stored here.
    fn stage_entries(&self, entries: &mut [&mut LedgerEntry]) -> Result<Vec<LedgerEntry>> {
        let fail_on = self.fail_on_entry.swap(0, Ordering::SeqCst);
        let next = self.entries.lock().unwrap().len() as i64 + 1;

        let mut staged = Vec::with_capacity(entries.len());
        for (offset, entry) in entries.iter_mut().enumerate() {
            if offset + 1 == fail_on {
                bail!("disk full");
            }
            entry.sequence = next + offset as i64;
            staged.push(entry.clone());
        }
        Ok(staged)
    }

    fn update_customer(
        &self,
        id: CustomerId,
        credit_balance: Cents,
        visit_count: Option<i64>,
    ) -> Result<()> {
        let mut customers = self.customers.lock().unwrap();
        let Some(customer) = customers.get_mut(&id) else {
            bail!("Customer {} does not exist", id);
        };
        customer.credit_balance = credit_balance;
        if let Some(visit_count) = visit_count {
            customer.visit_count = visit_count;
        }
        self.customer_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl CustomerStore for RecordingStore {
    async fn create_customer(&self, customer: &Customer) -> Result<()> {
        self.seed(customer.clone());
        Ok(())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.customers.lock().unwrap().get(&id).cloned())
    }

    async fn find_customer_by_phone(&self, phone: &str) -> Result<Option<Customer>> {
        Ok(self
            .customers
            .lock()
            .unwrap()
            .values()
            .find(|c| c.phone == phone)
            .cloned())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        Ok(self.customers.lock().unwrap().values().cloned().collect())
    }

    async fn record_visit(
        &self,
        visit: &VisitEvent,
        entries: &mut [LedgerEntry],
        credit_balance: Cents,
        visit_count: i64,
    ) -> Result<()> {
        let staged = self.stage_entries(&mut entries.iter_mut().collect::<Vec<_>>())?;
        self.update_customer(visit.customer_id, credit_balance, Some(visit_count))?;
        self.visits.lock().unwrap().push(visit.clone());
        self.entries.lock().unwrap().extend(staged);
        Ok(())
    }

    async fn record_credit_change(
        &self,
        entry: &mut LedgerEntry,
        credit_balance: Cents,
    ) -> Result<()> {
        let staged = self.stage_entries(&mut [entry])?;
        self.update_customer(staged[0].customer_id, credit_balance, None)?;
        self.entries.lock().unwrap().extend(staged);
        Ok(())
    }

    async fn list_entries(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn list_entries_for_customer(&self, id: CustomerId) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.customer_id == id)
            .cloned()
            .collect())
    }

    async fn list_visits(&self) -> Result<Vec<VisitEvent>> {
        Ok(self.visits.lock().unwrap().clone())
    }

    async fn list_visits_for_customer(&self, id: CustomerId) -> Result<Vec<VisitEvent>> {
        Ok(self
            .visits
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.customer_id == id)
            .cloned()
            .collect())
    }

    async fn save_feedback(&self, feedback: &Feedback, tip: Option<&mut LedgerEntry>) -> Result<()> {
        let staged = match tip {
            Some(entry) => self.stage_entries(&mut [entry])?,
            None => Vec::new(),
        };
        self.feedback.lock().unwrap().push(feedback.clone());
        self.entries.lock().unwrap().extend(staged);
        Ok(())
    }

    async fn list_feedback_for_customer(&self, id: CustomerId) -> Result<Vec<Feedback>> {
        Ok(self
            .feedback
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.customer_id == id)
            .cloned()
            .collect())
    }
}

/// Service over a fresh recording store
pub fn recording_service(pricing: PricingTable) -> LedgerService<RecordingStore> {
    LedgerService::new(RecordingStore::default(), pricing)
}
