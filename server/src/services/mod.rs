pub mod issuance;
pub mod validation;

pub use issuance::{issue, Issuance, PurchaseItem};
