use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::domain::{Cents, Customer, CustomerId, EntryKind, Feedback, LedgerEntry, VisitEvent};

use super::{CustomerStore, MIGRATION_001_INITIAL, MIGRATION_002_FEEDBACK, MIGRATION_003_VISITS};

const CUSTOMER_COLUMNS: &str =
    "id, name, phone, address, credit_balance, visit_count, created_at";

const ENTRY_COLUMNS: &str =
    "id, sequence, customer_id, kind, amount_cents, visit_id, description, recorded_at";

const VISIT_COLUMNS: &str =
    "id, customer_id, category, quantity, base_fee_cents, fee_charged_cents, occurred_at";

/// SQLite-backed store for customers, visits, ledger entries and feedback.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create tables if they don't exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_FEEDBACK)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        sqlx::query(MIGRATION_003_VISITS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 003")?;

        Ok(())
    }

    /// Connect and migrate.
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Next entry sequence number. Runs inside the caller's transaction so a
    /// rolled-back write leaves no gap.
    async fn next_sequence(conn: &mut SqliteConnection) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'entry_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *conn)
        .await
        .context("Failed to get next sequence number")?;

        Ok(row.get("value"))
    }

    /// Insert an entry within an already-started transaction.
    async fn insert_entry(conn: &mut SqliteConnection, entry: &mut LedgerEntry) -> Result<()> {
        entry.sequence = Self::next_sequence(&mut *conn).await?;

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, sequence, customer_id, kind, amount_cents, visit_id, description, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.sequence)
        .bind(entry.customer_id.to_string())
        .bind(entry.kind.as_str())
        .bind(entry.amount_cents)
        .bind(entry.visit_id.map(|id| id.to_string()))
        .bind(&entry.description)
        .bind(entry.recorded_at.to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to save ledger entry")?;

        Ok(())
    }

    async fn insert_visit(conn: &mut SqliteConnection, visit: &VisitEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO visits (id, customer_id, category, quantity, base_fee_cents, fee_charged_cents, occurred_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(visit.id.to_string())
        .bind(visit.customer_id.to_string())
        .bind(&visit.category)
        .bind(visit.quantity)
        .bind(visit.base_fee)
        .bind(visit.fee_charged)
        .bind(visit.occurred_at.to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to save visit")?;

        Ok(())
    }

    fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Customer {
            id: Uuid::parse_str(&id_str).context("Invalid customer ID")?,
            name: row.get("name"),
            phone: row.get("phone"),
            address: row.get("address"),
            credit_balance: row.get("credit_balance"),
            visit_count: row.get("visit_count"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<LedgerEntry> {
        let id_str: String = row.get("id");
        let customer_id_str: String = row.get("customer_id");
        let kind_str: String = row.get("kind");
        let visit_id_str: Option<String> = row.get("visit_id");
        let recorded_at_str: String = row.get("recorded_at");

        Ok(LedgerEntry {
            id: Uuid::parse_str(&id_str).context("Invalid entry ID")?,
            sequence: row.get("sequence"),
            customer_id: Uuid::parse_str(&customer_id_str).context("Invalid customer ID")?,
            kind: EntryKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid entry kind: {}", kind_str))?,
            amount_cents: row.get("amount_cents"),
            visit_id: visit_id_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid visit ID")?,
            description: row.get("description"),
            recorded_at: parse_timestamp(&recorded_at_str)?,
        })
    }

    fn row_to_visit(row: &sqlx::sqlite::SqliteRow) -> Result<VisitEvent> {
        let id_str: String = row.get("id");
        let customer_id_str: String = row.get("customer_id");
        let occurred_at_str: String = row.get("occurred_at");

        Ok(VisitEvent {
            id: Uuid::parse_str(&id_str).context("Invalid visit ID")?,
            customer_id: Uuid::parse_str(&customer_id_str).context("Invalid customer ID")?,
            category: row.get("category"),
            quantity: row.get("quantity"),
            base_fee: row.get("base_fee_cents"),
            fee_charged: row.get("fee_charged_cents"),
            occurred_at: parse_timestamp(&occurred_at_str)?,
        })
    }

    fn row_to_feedback(row: &sqlx::sqlite::SqliteRow) -> Result<Feedback> {
        let id_str: String = row.get("id");
        let customer_id_str: String = row.get("customer_id");
        let stars: i64 = row.get("stars");
        let created_at_str: String = row.get("created_at");

        Ok(Feedback {
            id: Uuid::parse_str(&id_str).context("Invalid feedback ID")?,
            customer_id: Uuid::parse_str(&customer_id_str).context("Invalid customer ID")?,
            stars: u8::try_from(stars).context("Invalid star rating")?,
            tip: row.get("tip_cents"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp: {}", s))?
        .with_timezone(&Utc))
}

impl CustomerStore for Repository {
    async fn create_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, address, credit_balance, visit_count, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(customer.id.to_string())
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.credit_balance)
        .bind(customer.visit_count)
        .bind(customer.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save customer")?;
        Ok(())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM customers WHERE id = ?",
            CUSTOMER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    async fn find_customer_by_phone(&self, phone: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM customers WHERE phone = ?",
            CUSTOMER_COLUMNS
        ))
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer by phone")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM customers ORDER BY name, phone",
            CUSTOMER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    async fn record_visit(
        &self,
        visit: &VisitEvent,
        entries: &mut [LedgerEntry],
        credit_balance: Cents,
        visit_count: i64,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin visit transaction")?;

        Self::insert_visit(&mut tx, visit).await?;
        for entry in entries.iter_mut() {
            Self::insert_entry(&mut tx, entry).await?;
        }

        let result = sqlx::query(
            "UPDATE customers SET credit_balance = ?, visit_count = ? WHERE id = ?",
        )
        .bind(credit_balance)
        .bind(visit_count)
        .bind(visit.customer_id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to update customer")?;

        if result.rows_affected() == 0 {
            bail!("Customer {} does not exist", visit.customer_id);
        }

        tx.commit().await.context("Failed to commit visit")?;
        Ok(())
    }

    async fn record_credit_change(
        &self,
        entry: &mut LedgerEntry,
        credit_balance: Cents,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin credit transaction")?;

        Self::insert_entry(&mut tx, entry).await?;

        let result = sqlx::query("UPDATE customers SET credit_balance = ? WHERE id = ?")
            .bind(credit_balance)
            .bind(entry.customer_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to update customer")?;

        if result.rows_affected() == 0 {
            bail!("Customer {} does not exist", entry.customer_id);
        }

        tx.commit().await.context("Failed to commit credit change")?;
        Ok(())
    }

    async fn list_entries(&self) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ledger_entries ORDER BY sequence",
            ENTRY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list ledger entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn list_entries_for_customer(&self, id: CustomerId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ledger_entries WHERE customer_id = ? ORDER BY sequence",
            ENTRY_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list ledger entries for customer")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn list_visits(&self) -> Result<Vec<VisitEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM visits ORDER BY occurred_at, rowid",
            VISIT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list visits")?;

        rows.iter().map(Self::row_to_visit).collect()
    }

    async fn list_visits_for_customer(&self, id: CustomerId) -> Result<Vec<VisitEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM visits WHERE customer_id = ? ORDER BY occurred_at, rowid",
            VISIT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list visits for customer")?;

        rows.iter().map(Self::row_to_visit).collect()
    }

    async fn save_feedback(&self, feedback: &Feedback, tip: Option<&mut LedgerEntry>) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin feedback transaction")?;

        sqlx::query(
            r#"
            INSERT INTO feedback (id, customer_id, stars, tip_cents, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(feedback.id.to_string())
        .bind(feedback.customer_id.to_string())
        .bind(i64::from(feedback.stars))
        .bind(feedback.tip)
        .bind(feedback.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save feedback")?;

        if let Some(entry) = tip {
            Self::insert_entry(&mut tx, entry).await?;
        }

        tx.commit().await.context("Failed to commit feedback")?;
        Ok(())
    }

    async fn list_feedback_for_customer(&self, id: CustomerId) -> Result<Vec<Feedback>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, stars, tip_cents, created_at
            FROM feedback
            WHERE customer_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list feedback")?;

        rows.iter().map(Self::row_to_feedback).collect()
    }
}
