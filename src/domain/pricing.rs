use std::collections::BTreeMap;

use thiserror::Error;

use super::Cents;

/// Price and first-visit credit for one billable category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRate {
    /// Price per unit of quantity or duration
    pub unit_price: Cents,
    /// Credit granted on a customer's first visit under `CreditPolicy::PerCategory`
    pub first_visit_credit: Cents,
}

/// How first-visit credit is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditPolicy {
    /// Look the credit up in the category table
    PerCategory,
    /// Same credit for every category
    Flat { amount: Cents },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("pricing table has no categories")]
    Empty,

    #[error("category '{0}' is listed more than once")]
    DuplicateCategory(String),

    #[error("category '{0}' must have a positive unit price")]
    NonPositivePrice(String),

    #[error("category '{0}' has a negative first-visit credit")]
    NegativeCredit(String),

    #[error("flat credit must not be negative")]
    NegativeFlatCredit,

    #[error("discount rate {0} must be in [0, 1)")]
    InvalidRate(f64),
}

/// The deployment's tariff: category prices, credit policy, repeat discount.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingTable {
    categories: BTreeMap<String, CategoryRate>,
    pub credit_policy: CreditPolicy,
    pub discount_rate: f64,
}

pub const DEFAULT_DISCOUNT_RATE: f64 = 0.10;

impl PricingTable {
    /// Build and validate a table. Category names are normalized to
    /// trimmed lowercase; two names that normalize alike are rejected.
    pub fn new(
        categories: impl IntoIterator<Item = (String, CategoryRate)>,
        credit_policy: CreditPolicy,
        discount_rate: f64,
    ) -> Result<Self, PricingError> {
        let mut normalized = BTreeMap::new();
        for (name, rate) in categories {
            let key = normalize(&name);
            if normalized.insert(key.clone(), rate).is_some() {
                return Err(PricingError::DuplicateCategory(key));
            }
        }

        let table = Self {
            categories: normalized,
            credit_policy,
            discount_rate,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        if self.categories.is_empty() {
            return Err(PricingError::Empty);
        }
        for (name, rate) in &self.categories {
            if rate.unit_price <= 0 {
                return Err(PricingError::NonPositivePrice(name.clone()));
            }
            if rate.first_visit_credit < 0 {
                return Err(PricingError::NegativeCredit(name.clone()));
            }
        }
        if let CreditPolicy::Flat { amount } = self.credit_policy {
            if amount < 0 {
                return Err(PricingError::NegativeFlatCredit);
            }
        }
        if !(0.0..1.0).contains(&self.discount_rate) {
            return Err(PricingError::InvalidRate(self.discount_rate));
        }
        Ok(())
    }

    /// Case-insensitive category lookup.
    pub fn rate(&self, category: &str) -> Option<&CategoryRate> {
        self.categories.get(&normalize(category))
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &CategoryRate)> {
        self.categories.iter().map(|(name, rate)| (name.as_str(), rate))
    }
}

impl Default for PricingTable {
    /// The parking tariff: 2/4/6-wheelers.
    fn default() -> Self {
        let categories = [
            ("2-wheeler", 2000, 1000),
            ("4-wheeler", 5000, 2000),
            ("6-wheeler", 10000, 3000),
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
        })
        .collect();

        Self {
            categories,
            credit_policy: CreditPolicy::PerCategory,
            discount_rate: DEFAULT_DISCOUNT_RATE,
        }
    }
}

pub fn normalize(category: &str) -> String {
    category.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(unit_price: Cents, first_visit_credit: Cents) -> CategoryRate {
        CategoryRate {
            unit_price,
            first_visit_credit,
        }
    }

    #[test]
    fn test_default_table_is_valid() {
        let table = PricingTable::default();
        assert!(table.validate().is_ok());
        assert_eq!(table.rate("4-wheeler").map(|r| r.unit_price), Some(5000));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = PricingTable::new(
            [("Lunch".to_string(), rate(5000, 500))],
            CreditPolicy::PerCategory,
            0.1,
        )
        .unwrap();
        assert!(table.rate("lunch").is_some());
        assert!(table.rate("  LUNCH ").is_some());
        assert!(table.rate("dinner").is_none());
    }

    #[test]
    fn test_rejects_names_that_collide_after_normalizing() {
        let result = PricingTable::new(
            [
                ("Chapathi".to_string(), rate(1500, 0)),
                (" chapathi".to_string(), rate(1000, 0)),
            ],
            CreditPolicy::PerCategory,
            0.1,
        );
        assert_eq!(result, Err(PricingError::DuplicateCategory("chapathi".into())));
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert_eq!(
            PricingTable::new(Vec::new(), CreditPolicy::PerCategory, 0.1),
            Err(PricingError::Empty)
        );
        assert_eq!(
            PricingTable::new([("a".into(), rate(0, 0))], CreditPolicy::PerCategory, 0.1),
            Err(PricingError::NonPositivePrice("a".into()))
        );
        assert_eq!(
            PricingTable::new([("a".into(), rate(100, -1))], CreditPolicy::PerCategory, 0.1),
            Err(PricingError::NegativeCredit("a".into()))
        );
        assert_eq!(
            PricingTable::new(
                [("a".into(), rate(100, 0))],
                CreditPolicy::Flat { amount: -5 },
                0.1
            ),
            Err(PricingError::NegativeFlatCredit)
        );
        assert_eq!(
            PricingTable::new([("a".into(), rate(100, 0))], CreditPolicy::PerCategory, 1.0),
            Err(PricingError::InvalidRate(1.0))
        );
    }
}
