//! Deployment configuration: database location and the pricing table.
//!
//! Money values are written as decimal strings (`"20.00"`) so the file reads
//! the way a tariff sheet does.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{
    CategoryRate, CreditPolicy, DEFAULT_DISCOUNT_RATE, ParseCentsError, PricingError,
    PricingTable, parse_cents,
};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "VISITLEDGER_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "visitledger.toml";

pub const DEFAULT_DATABASE: &str = "visitledger.db";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid money value for {field}: {source}")]
    Money {
        field: String,
        #[source]
        source: ParseCentsError,
    },

    #[error("invalid pricing: {0}")]
    Pricing(#[from] PricingError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: String,
    pub pricing: PricingTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            pricing: PricingTable::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    database: Option<String>,
    discount_rate: Option<f64>,
    credit_policy: Option<RawCreditPolicy>,
    #[serde(default)]
    categories: BTreeMap<String, RawCategory>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawCreditPolicy {
    PerCategory,
    Flat { amount: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCategory {
    unit_price: String,
    first_visit_credit: Option<String>,
}

fn money(field: impl Into<String>, value: &str) -> Result<i64, ConfigError> {
    parse_cents(value).map_err(|source| ConfigError::Money {
        field: field.into(),
        source,
    })
}

impl Config {
    /// Parse a TOML document. Omitted sections fall back to the defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;

        let categories: Vec<(String, CategoryRate)> = if raw.categories.is_empty() {
            PricingTable::default()
                .categories()
                .map(|(name, rate)| (name.to_string(), *rate))
                .collect()
        } else {
            raw.categories
                .iter()
                .map(|(name, category)| -> Result<(String, CategoryRate), ConfigError> {
                    let unit_price = money(format!("{}.unit_price", name), &category.unit_price)?;
                    let first_visit_credit = match &category.first_visit_credit {
                        Some(value) => money(format!("{}.first_visit_credit", name), value)?,
                        None => 0,
                    };
                    Ok((
                        name.clone(),
                        CategoryRate {
                            unit_price,
                            first_visit_credit,
                        },
                    ))
                })
                .collect::<Result<_, _>>()?
        };

        let credit_policy = match raw.credit_policy {
            None | Some(RawCreditPolicy::PerCategory) => CreditPolicy::PerCategory,
            Some(RawCreditPolicy::Flat { amount }) => CreditPolicy::Flat {
                amount: money("credit_policy.amount", &amount)?,
            },
        };

        let pricing = PricingTable::new(
            categories,
            credit_policy,
            raw.discount_rate.unwrap_or(DEFAULT_DISCOUNT_RATE),
        )?;

        Ok(Self {
            database: raw.database.unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            pricing,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load with priority: explicit path > $VISITLEDGER_CONFIG > ./visitledger.toml > defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            tracing::debug!("Using config from --config: {}", path.display());
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            tracing::debug!("Using config from {}: {}", CONFIG_ENV, path);
            return Self::from_file(Path::new(&path));
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            tracing::debug!("Using config from {}", local.display());
            return Self::from_file(local);
        }

        tracing::debug!("No config file found, using built-in parking tariff");
        Ok(Self::default())
    }
}
