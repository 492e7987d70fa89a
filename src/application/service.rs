use tracing::{debug, info, warn};

use crate::domain::{
    Cents, Customer, CustomerId, EntryKind, Feedback, IntegrityReport, LedgerEntry, MAX_ADJUSTMENT,
    MAX_STARS, MIN_DEPOSIT, PricingTable, VisitEvent, assess_visit, build_integrity_report,
    format_cents, is_valid_phone, normalize,
};
use crate::storage::{CustomerStore, Repository};

use super::AppError;

/// Application service for billing visits and moving loyalty credit.
/// This is the primary interface for any client (CLI, tests, other front ends).
pub struct LedgerService<S = Repository> {
    store: S,
    pricing: PricingTable,
}

/// Outcome of processing one visit.
#[derive(Debug, Clone)]
pub struct VisitReceipt {
    pub visit: VisitEvent,
    pub fee_charged: Cents,
    pub credit_applied: Cents,
    pub credit_forfeited: Cents,
    pub credit_earned: Cents,
    pub discount_applied: bool,
    pub discount_amount: Cents,
    pub balance_after: Cents,
    pub visit_count_after: i64,
}

/// Outcome of a manual credit deposit or withdrawal.
#[derive(Debug, Clone)]
pub struct CreditAdjustment {
    pub entry: LedgerEntry,
    pub balance_after: Cents,
}

/// Customer with their visits and ledger history.
pub struct CustomerInfo {
    pub customer: Customer,
    pub visits: Vec<VisitEvent>,
    pub entries: Vec<LedgerEntry>,
    pub feedback: Vec<Feedback>,
}

impl LedgerService<Repository> {
    /// Create the database at the given path if needed and connect.
    pub async fn init(database_path: &str, pricing: PricingTable) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo, pricing))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, pricing: PricingTable) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo, pricing))
    }
}

impl<S: CustomerStore> LedgerService<S> {
    pub fn new(store: S, pricing: PricingTable) -> Self {
        Self { store, pricing }
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ========================
    // Customer operations
    // ========================

    /// Register a new customer. The phone number is the unique contact key.
    pub async fn register_customer(
        &self,
        name: &str,
        phone: &str,
        address: Option<String>,
    ) -> Result<Customer, AppError> {
        let name = name.trim();
        let phone = phone.trim();

        if name.is_empty() {
            return Err(AppError::InvalidContact("name must not be empty".to_string()));
        }
        if !is_valid_phone(phone) {
            warn!(phone, "rejected phone number");
            return Err(AppError::InvalidContact(format!(
                "phone number must be 10 to 12 digits, got '{}'",
                phone
            )));
        }
        if self.store.find_customer_by_phone(phone).await?.is_some() {
            return Err(AppError::CustomerAlreadyExists(phone.to_string()));
        }

        let mut customer = Customer::new(name, phone);
        if let Some(address) = address.filter(|a| !a.trim().is_empty()) {
            customer = customer.with_address(address);
        }

        self.store.create_customer(&customer).await?;
        info!(customer = %customer.id, name = %customer.name, "registered customer");
        Ok(customer)
    }

    /// Return the customer with this phone, registering them if unknown.
    pub async fn find_or_register_customer(
        &self,
        name: &str,
        phone: &str,
        address: Option<String>,
    ) -> Result<Customer, AppError> {
        match self.store.find_customer_by_phone(phone.trim()).await? {
            Some(customer) => Ok(customer),
            None => self.register_customer(name, phone, address).await,
        }
    }

    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer, AppError> {
        self.store
            .get_customer(id)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(id.to_string()))
    }

    pub async fn get_customer_by_phone(&self, phone: &str) -> Result<Customer, AppError> {
        self.store
            .find_customer_by_phone(phone.trim())
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(phone.to_string()))
    }

    pub async fn get_customer_info(&self, phone: &str) -> Result<CustomerInfo, AppError> {
        let customer = self.get_customer_by_phone(phone).await?;
        let visits = self.store.list_visits_for_customer(customer.id).await?;
        let entries = self.store.list_entries_for_customer(customer.id).await?;
        let feedback = self.store.list_feedback_for_customer(customer.id).await?;
        Ok(CustomerInfo {
            customer,
            visits,
            entries,
            feedback,
        })
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        Ok(self.store.list_customers().await?)
    }

    // ========================
    // Visit operations
    // ========================

    /// Bill one visit: offset with credit, discount repeat customers, grant
    /// first-visit credit, then persist the new balance and visit count.
    ///
    /// The visit, its entries and the customer's new state are stored in a
    /// single write; on failure nothing is stored.
    pub async fn process_visit(
        &self,
        customer_id: CustomerId,
        category: &str,
        quantity: i64,
    ) -> Result<VisitReceipt, AppError> {
        let customer = self.get_customer(customer_id).await?;

        let assessment = assess_visit(&customer, category, quantity, &self.pricing)
            .inspect_err(|err| warn!(customer = %customer_id, %err, "visit rejected"))?;
        debug!(customer = %customer_id, ?assessment, "assessed visit");

        let visit = VisitEvent::new(
            customer.id,
            normalize(category),
            quantity,
            assessment.base_fee,
            assessment.fee_charged,
        );

        let fee_description = if assessment.discount_applied {
            format!(
                "{} x {} ({}% repeat discount)",
                quantity,
                visit.category,
                (self.pricing.discount_rate * 100.0).round()
            )
        } else {
            format!("{} x {}", quantity, visit.category)
        };

        let pending = [
            (EntryKind::CreditApplied, assessment.credit_applied, None),
            (
                EntryKind::CreditForfeited,
                assessment.credit_forfeited,
                Some("credit in excess of fee".to_string()),
            ),
            (EntryKind::FeeCharge, assessment.fee_charged, Some(fee_description)),
            (
                EntryKind::CreditEarned,
                assessment.credit_earned,
                Some("first visit".to_string()),
            ),
        ];

        let mut entries: Vec<LedgerEntry> = pending
            .into_iter()
            .filter_map(|(kind, amount, description)| {
                let entry = LedgerEntry::new(customer.id, kind, amount)?.with_visit(visit.id);
                Some(match description {
                    Some(description) => entry.with_description(description),
                    None => entry,
                })
            })
            .collect();

        self.store
            .record_visit(
                &visit,
                &mut entries,
                assessment.balance_after,
                assessment.visit_count_after,
            )
            .await?;

        info!(
            customer = %customer.id,
            visit = %visit.id,
            category = %visit.category,
            fee = %format_cents(assessment.fee_charged),
            credit_applied = %format_cents(assessment.credit_applied),
            credit_earned = %format_cents(assessment.credit_earned),
            discount = assessment.discount_applied,
            visits = assessment.visit_count_after,
            "processed visit"
        );

        Ok(VisitReceipt {
            visit,
            fee_charged: assessment.fee_charged,
            credit_applied: assessment.credit_applied,
            credit_forfeited: assessment.credit_forfeited,
            credit_earned: assessment.credit_earned,
            discount_applied: assessment.discount_applied,
            discount_amount: assessment.discount_amount,
            balance_after: assessment.balance_after,
            visit_count_after: assessment.visit_count_after,
        })
    }

    // ========================
    // Credit operations
    // ========================

    /// Add credit to a customer's balance by hand.
    pub async fn deposit_credit(
        &self,
        customer_id: CustomerId,
        amount_cents: Cents,
    ) -> Result<CreditAdjustment, AppError> {
        validate_deposit(amount_cents)?;
        let customer = self.get_customer(customer_id).await?;

        let balance_after = customer
            .credit_balance
            .checked_add(amount_cents)
            .ok_or_else(|| AppError::InvalidAmount("credit balance overflow".to_string()))?;

        self.adjust_credit(&customer, EntryKind::Deposit, amount_cents, balance_after)
            .await
    }

    /// Remove credit from a customer's balance by hand. Any positive amount
    /// up to the balance may be withdrawn.
    pub async fn withdraw_credit(
        &self,
        customer_id: CustomerId,
        amount_cents: Cents,
    ) -> Result<CreditAdjustment, AppError> {
        validate_withdrawal(amount_cents)?;
        let customer = self.get_customer(customer_id).await?;

        if customer.credit_balance < amount_cents {
            return Err(AppError::InsufficientCredit {
                customer: customer.name,
                balance: customer.credit_balance,
                requested: amount_cents,
            });
        }
        let balance_after = customer.credit_balance - amount_cents;

        self.adjust_credit(&customer, EntryKind::Withdrawal, amount_cents, balance_after)
            .await
    }

    async fn adjust_credit(
        &self,
        customer: &Customer,
        kind: EntryKind,
        amount_cents: Cents,
        balance_after: Cents,
    ) -> Result<CreditAdjustment, AppError> {
        let mut entry = LedgerEntry::new(customer.id, kind, amount_cents)
            .ok_or_else(|| AppError::InvalidAmount("amount must be positive".to_string()))?;

        self.store
            .record_credit_change(&mut entry, balance_after)
            .await?;

        info!(
            customer = %customer.id,
            kind = %kind,
            amount = %format_cents(amount_cents),
            balance = %format_cents(balance_after),
            "adjusted credit"
        );
        Ok(CreditAdjustment {
            entry,
            balance_after,
        })
    }

    // ========================
    // Feedback operations
    // ========================

    /// Record a star rating and an optional tip.
    pub async fn record_feedback(
        &self,
        customer_id: CustomerId,
        stars: u8,
        tip_cents: Cents,
    ) -> Result<Feedback, AppError> {
        if stars > MAX_STARS {
            return Err(AppError::InvalidRating(stars));
        }
        if tip_cents < 0 {
            return Err(AppError::InvalidAmount("tip must not be negative".to_string()));
        }
        let customer = self.get_customer(customer_id).await?;

        let feedback = Feedback::new(customer.id, stars, tip_cents);
        let mut tip = LedgerEntry::new(customer.id, EntryKind::Tip, tip_cents)
            .map(|entry| entry.with_description(format!("{} star feedback", stars)));
        self.store.save_feedback(&feedback, tip.as_mut()).await?;

        info!(customer = %customer.id, stars, tip = %format_cents(tip_cents), "recorded feedback");
        Ok(feedback)
    }

    // ========================
    // Ledger queries
    // ========================

    pub async fn customer_history(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        let customer = self.get_customer(customer_id).await?;
        Ok(self.store.list_entries_for_customer(customer.id).await?)
    }

    pub async fn list_entries(&self) -> Result<Vec<LedgerEntry>, AppError> {
        Ok(self.store.list_entries().await?)
    }

    /// A customer's visits, oldest first.
    pub async fn customer_visits(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<VisitEvent>, AppError> {
        let customer = self.get_customer(customer_id).await?;
        Ok(self.store.list_visits_for_customer(customer.id).await?)
    }

    pub async fn list_visits(&self) -> Result<Vec<VisitEvent>, AppError> {
        Ok(self.store.list_visits().await?)
    }

    /// Cross-check stored balances and visit counts against the ledger.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let customers = self.store.list_customers().await?;
        let visits = self.store.list_visits().await?;
        let entries = self.store.list_entries().await?;
        Ok(build_integrity_report(&customers, &visits, &entries))
    }
}

fn validate_deposit(amount_cents: Cents) -> Result<(), AppError> {
    if !(MIN_DEPOSIT..=MAX_ADJUSTMENT).contains(&amount_cents) {
        return Err(AppError::InvalidAmount(format!(
            "deposit must be between {} and {}, got {}",
            format_cents(MIN_DEPOSIT),
            format_cents(MAX_ADJUSTMENT),
            format_cents(amount_cents)
        )));
    }
    Ok(())
}

fn validate_withdrawal(amount_cents: Cents) -> Result<(), AppError> {
    if amount_cents <= 0 || amount_cents > MAX_ADJUSTMENT {
        return Err(AppError::InvalidAmount(format!(
            "withdrawal must be positive and at most {}, got {}",
            format_cents(MAX_ADJUSTMENT),
            format_cents(amount_cents)
        )));
    }
    Ok(())
}
