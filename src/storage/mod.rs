mod repository;
mod store;

pub use repository::*;
pub use store::*;

/// SQL migration for customers and the ledger
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for feedback
pub const MIGRATION_002_FEEDBACK: &str = include_str!("migrations/002_feedback.sql");

/// SQL migration for visit records
pub const MIGRATION_003_VISITS: &str = include_str!("migrations/003_visits.sql");
