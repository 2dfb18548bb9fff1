//! Domain type modules

pub mod crm;
pub mod salesforce;
pub mod sync;

pub use crm::*;
pub use salesforce::*;
pub use sync::*;
