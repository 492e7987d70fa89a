//! Visit billing rules: credit offset, first-visit credit, repeat discount.
//!
//! Everything here is pure. `assess_visit` composes the individual rules in
//! the order billing depends on:
//!
//! 1. base fee = unit price * quantity
//! 2. existing credit offsets the base fee
//! 3. discount eligibility comes from the visit count *before* this visit
//!    and applies to what remains after credit
//! 4. first-visit credit is judged on this visit's number (count + 1)
//! 5. the count is incremented last, by the caller persisting the result

use serde::Serialize;
use thiserror::Error;

use super::{Cents, CreditPolicy, Customer, PricingTable};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccrualError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid category: {0}")]
    InvalidCategory(String),
}

/// Offset `fee` with `balance`. Returns `(remaining_fee, new_balance)`.
///
/// A balance that covers the fee is consumed entirely: any excess is
/// forfeited rather than carried forward.
pub fn apply_credit(balance: Cents, fee: Cents) -> (Cents, Cents) {
    if balance <= 0 {
        (fee, balance)
    } else if balance >= fee {
        (0, 0)
    } else {
        (fee - balance, 0)
    }
}

/// Credit earned by the visit numbered `visit_number` (1 for a first visit).
/// Only first visits earn. An unknown category earns nothing under
/// `CreditPolicy::PerCategory`.
pub fn accrue_visit_credit(visit_number: i64, category: &str, pricing: &PricingTable) -> Cents {
    if visit_number != 1 {
        return 0;
    }
    match pricing.credit_policy {
        CreditPolicy::PerCategory => pricing
            .rate(category)
            .map(|rate| rate.first_visit_credit)
            .unwrap_or(0),
        CreditPolicy::Flat { amount } => amount,
    }
}

pub fn is_discount_eligible(visit_count: i64) -> bool {
    visit_count > 1
}

/// `fee * (1 - rate)` rounded to the nearest cent when eligible.
pub fn apply_discount(fee: Cents, eligible: bool, rate: f64) -> Cents {
    if !eligible {
        return fee;
    }
    (fee as f64 * (1.0 - rate)).round() as Cents
}

pub fn increment_visit(visit_count: i64) -> i64 {
    visit_count + 1
}

/// Outcome of billing one visit, computed without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisitAssessment {
    pub base_fee: Cents,
    /// Part of the fee covered by credit
    pub credit_applied: Cents,
    /// Credit consumed beyond the fee
    pub credit_forfeited: Cents,
    pub discount_applied: bool,
    pub discount_amount: Cents,
    pub fee_charged: Cents,
    pub credit_earned: Cents,
    pub balance_after: Cents,
    pub visit_count_after: i64,
}

pub fn assess_visit(
    customer: &Customer,
    category: &str,
    quantity: i64,
    pricing: &PricingTable,
) -> Result<VisitAssessment, AccrualError> {
    if quantity <= 0 {
        return Err(AccrualError::InvalidAmount(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }

    let rate = pricing
        .rate(category)
        .ok_or_else(|| AccrualError::InvalidCategory(category.to_string()))?;

    let base_fee = rate
        .unit_price
        .checked_mul(quantity)
        .ok_or_else(|| AccrualError::InvalidAmount(format!("fee overflow for quantity {}", quantity)))?;
    if base_fee <= 0 {
        return Err(AccrualError::InvalidAmount(format!(
            "fee must be positive, got {}",
            base_fee
        )));
    }

    let balance_before = customer.credit_balance;
    let (remaining, balance_after_credit) = apply_credit(balance_before, base_fee);
    let credit_applied = base_fee - remaining;
    let credit_consumed = balance_before.max(0) - balance_after_credit.max(0);
    let credit_forfeited = credit_consumed - credit_applied;

    let discount_applied = is_discount_eligible(customer.visit_count);
    let fee_charged = apply_discount(remaining, discount_applied, pricing.discount_rate);

    let visit_count_after = increment_visit(customer.visit_count);
    let credit_earned = accrue_visit_credit(visit_count_after, category, pricing);

    Ok(VisitAssessment {
        base_fee,
        credit_applied,
        credit_forfeited,
        discount_applied,
        discount_amount: remaining - fee_charged,
        fee_charged,
        credit_earned,
        balance_after: balance_after_credit + credit_earned,
        visit_count_after,
    })
}
