use thiserror::Error;

use crate::domain::{AccrualError, Cents};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Customer already exists with phone {0}")]
    CustomerAlreadyExists(String),

    #[error("Invalid contact details: {0}")]
    InvalidContact(String),

    #[error("Insufficient credit for {customer}: balance {balance}, requested {requested}")]
    InsufficientCredit {
        customer: String,
        balance: Cents,
        requested: Cents,
    },

    #[error("Invalid star rating {0} (expected 0-5)")]
    InvalidRating(u8),

    #[error("Persistence error: {0}")]
    Persistence(#[from] anyhow::Error),
}

impl From<AccrualError> for AppError {
    fn from(err: AccrualError) -> Self {
        match err {
            AccrualError::InvalidAmount(msg) => AppError::InvalidAmount(msg),
            AccrualError::InvalidCategory(category) => AppError::InvalidCategory(category),
        }
    }
}
