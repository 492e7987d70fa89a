use std::collections::{HashMap, HashSet};

use super::{Cents, Customer, CustomerId, LedgerEntry, VisitEvent, VisitId, replay_credit_balance};

/// Result of cross-checking stored customer state against the ledger.
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub customer_count: usize,
    pub visit_count: usize,
    pub entry_count: usize,
    pub total_credit_outstanding: Cents,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Each customer's stored visit count must match their stored visits, and
/// every entry stamped with a visit id must belong to a stored visit of the
/// same customer.
pub fn build_integrity_report(
    customers: &[Customer],
    visits: &[VisitEvent],
    entries: &[LedgerEntry],
) -> IntegrityReport {
    let mut issues = Vec::new();

    let mut sequences: Vec<i64> = entries.iter().map(|e| e.sequence).collect();
    sequences.sort_unstable();
    if sequences.iter().zip(1..).any(|(seq, expected)| *seq != expected) {
        issues.push("Entry sequence has gaps or duplicates".to_string());
    }

    let known: HashSet<CustomerId> = customers.iter().map(|c| c.id).collect();
    let orphans = entries
        .iter()
        .filter(|e| !known.contains(&e.customer_id))
        .count();
    if orphans > 0 {
        issues.push(format!("{} entries reference unknown customers", orphans));
    }

    let visit_owners: HashMap<VisitId, CustomerId> =
        visits.iter().map(|v| (v.id, v.customer_id)).collect();
    let stray = entries
        .iter()
        .filter(|e| {
            e.visit_id
                .is_some_and(|visit| visit_owners.get(&visit) != Some(&e.customer_id))
        })
        .count();
    if stray > 0 {
        issues.push(format!("{} entries reference unknown visits", stray));
    }

    let invalid_amounts = entries.iter().filter(|e| e.amount_cents <= 0).count();
    if invalid_amounts > 0 {
        issues.push(format!("{} entries have non-positive amounts", invalid_amounts));
    }

    let mut by_customer: HashMap<CustomerId, Vec<&LedgerEntry>> = HashMap::new();
    for entry in entries {
        by_customer.entry(entry.customer_id).or_default().push(entry);
    }

    for customer in customers {
        let own = by_customer.get(&customer.id).map(Vec::as_slice).unwrap_or(&[]);

        if customer.credit_balance < 0 {
            issues.push(format!(
                "{} ({}) has negative credit {}",
                customer.name, customer.phone, customer.credit_balance
            ));
        }

        let replayed = replay_credit_balance(own.iter().copied());
        if replayed != customer.credit_balance {
            issues.push(format!(
                "{} ({}) stores credit {} but ledger replays to {}",
                customer.name, customer.phone, customer.credit_balance, replayed
            ));
        }

        let recorded = visits.iter().filter(|v| v.customer_id == customer.id).count();
        if recorded as i64 != customer.visit_count {
            issues.push(format!(
                "{} ({}) stores {} visits but {} are recorded",
                customer.name, customer.phone, customer.visit_count, recorded
            ));
        }
    }

    IntegrityReport {
        customer_count: customers.len(),
        visit_count: visits.len(),
        entry_count: entries.len(),
        total_credit_outstanding: customers.iter().map(|c| c.credit_balance).sum(),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntryKind;

    fn entry(customer: &Customer, kind: EntryKind, amount: Cents, seq: i64) -> LedgerEntry {
        let mut entry = LedgerEntry::new(customer.id, kind, amount).unwrap();
        entry.sequence = seq;
        entry
    }

    fn visit(customer: &Customer, base_fee: Cents) -> VisitEvent {
        VisitEvent::new(customer.id, "medium".into(), 1, base_fee, base_fee)
    }

    #[test]
    fn test_consistent_ledger_is_healthy() {
        let mut customer = Customer::new("Meena", "9123456780");
        customer.credit_balance = 2000;
        customer.visit_count = 1;

        let first = visit(&customer, 5000);
        let entries = vec![
            entry(&customer, EntryKind::FeeCharge, 5000, 1).with_visit(first.id),
            entry(&customer, EntryKind::CreditEarned, 2000, 2).with_visit(first.id),
        ];

        let report = build_integrity_report(&[customer], &[first], &entries);
        assert!(report.is_healthy(), "{:?}", report.issues);
        assert_eq!(report.total_credit_outstanding, 2000);
        assert_eq!(report.visit_count, 1);
    }

    #[test]
    fn test_detects_balance_drift_and_gaps() {
        let mut customer = Customer::new("Meena", "9123456780");
        customer.credit_balance = 500;

        let entries = vec![entry(&customer, EntryKind::Deposit, 1000, 2)];

        let report = build_integrity_report(&[customer], &[], &entries);
        assert!(!report.is_healthy());
        assert_eq!(report.issues.len(), 2);
    }

    #[test]
    fn test_detects_visit_count_mismatch_and_orphans() {
        let mut customer = Customer::new("Meena", "9123456780");
        customer.visit_count = 2;
        let stranger = Customer::new("Ghost", "9000000000");

        let only = visit(&customer, 100);
        let entries = vec![
            entry(&customer, EntryKind::FeeCharge, 100, 1).with_visit(only.id),
            entry(&stranger, EntryKind::Tip, 100, 2),
        ];

        let report = build_integrity_report(&[customer], &[only], &entries);
        assert_eq!(report.issues.len(), 2, "{:?}", report.issues);
    }

    #[test]
    fn test_detects_entries_for_missing_visits() {
        let mut customer = Customer::new("Meena", "9123456780");
        customer.visit_count = 1;
        let mut other = Customer::new("Ravi", "9000000001");
        other.visit_count = 1;

        let stored = visit(&customer, 5000);
        let foreign = visit(&other, 5000);
        let entries = vec![
            entry(&customer, EntryKind::FeeCharge, 5000, 1).with_visit(stored.id),
            entry(&customer, EntryKind::FeeCharge, 5000, 2).with_visit(foreign.id),
        ];

        let report = build_integrity_report(&[customer, other], &[stored, foreign], &entries);
        assert_eq!(
            report.issues,
            vec!["1 entries reference unknown visits".to_string()]
        );
    }
}
