mod accrual;
mod customer;
mod entry;
mod feedback;
mod integrity;
mod money;
mod pricing;
mod visit;

pub use accrual::*;
pub use customer::*;
pub use entry::*;
pub use feedback::*;
pub use integrity::*;
pub use money::*;
pub use pricing::*;
pub use visit::*;
