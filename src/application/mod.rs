// Application layer - use cases and orchestration over a CustomerStore.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
