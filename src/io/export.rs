use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::LedgerService;
use crate::domain::{Customer, CustomerId, LedgerEntry, VisitEvent, format_cents};
use crate::storage::CustomerStore;

/// Full ledger snapshot for JSON export
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub customers: Vec<Customer>,
    pub visits: Vec<VisitEvent>,
    pub entries: Vec<LedgerEntry>,
}

/// Writes customers, visits and ledger entries as CSV or JSON.
pub struct Exporter<'a, S> {
    service: &'a LedgerService<S>,
}

impl<'a, S: CustomerStore> Exporter<'a, S> {
    pub fn new(service: &'a LedgerService<S>) -> Self {
        Self { service }
    }

    pub async fn export_customers_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let customers = self.service.list_customers().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "name",
            "phone",
            "address",
            "credit_balance",
            "visit_count",
            "created_at",
        ])?;

        for customer in &customers {
            csv_writer.write_record([
                customer.id.to_string(),
                customer.name.clone(),
                customer.phone.clone(),
                customer.address.clone().unwrap_or_default(),
                format_cents(customer.credit_balance),
                customer.visit_count.to_string(),
                customer.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(customers.len())
    }

    /// Visits oldest first, with the customer's phone alongside the id.
    pub async fn export_visits_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let visits = self.service.list_visits().await?;
        let phones = self.phones().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "customer_id",
            "phone",
            "category",
            "quantity",
            "base_fee",
            "fee_charged",
            "occurred_at",
        ])?;

        for visit in &visits {
            csv_writer.write_record([
                visit.id.to_string(),
                visit.customer_id.to_string(),
                phones.get(&visit.customer_id).cloned().unwrap_or_default(),
                visit.category.clone(),
                visit.quantity.to_string(),
                format_cents(visit.base_fee),
                format_cents(visit.fee_charged),
                visit.occurred_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(visits.len())
    }

    /// Entries in sequence order, with the customer's phone alongside the id.
    pub async fn export_entries_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let entries = self.service.list_entries().await?;
        let phones = self.phones().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "sequence",
            "customer_id",
            "phone",
            "kind",
            "amount",
            "visit_id",
            "description",
            "recorded_at",
        ])?;

        for entry in &entries {
            csv_writer.write_record([
                entry.id.to_string(),
                entry.sequence.to_string(),
                entry.customer_id.to_string(),
                phones.get(&entry.customer_id).cloned().unwrap_or_default(),
                entry.kind.as_str().to_string(),
                format_cents(entry.amount_cents),
                entry.visit_id.map(|id| id.to_string()).unwrap_or_default(),
                entry.description.clone().unwrap_or_default(),
                entry.recorded_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(entries.len())
    }

    pub async fn export_customers_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let customers = self.service.list_customers().await?;
        serde_json::to_writer_pretty(&mut writer, &customers)?;
        writer.flush()?;
        Ok(customers.len())
    }

    pub async fn export_visits_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let visits = self.service.list_visits().await?;
        serde_json::to_writer_pretty(&mut writer, &visits)?;
        writer.flush()?;
        Ok(visits.len())
    }

    pub async fn export_entries_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let entries = self.service.list_entries().await?;
        serde_json::to_writer_pretty(&mut writer, &entries)?;
        writer.flush()?;
        Ok(entries.len())
    }

    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            customers: self.service.list_customers().await?,
            visits: self.service.list_visits().await?,
            entries: self.service.list_entries().await?,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.flush()?;
        Ok(snapshot)
    }

    async fn phones(&self) -> Result<HashMap<CustomerId, String>> {
        Ok(self
            .service
            .list_customers()
            .await?
            .into_iter()
            .map(|c| (c.id, c.phone))
            .collect())
    }
}
