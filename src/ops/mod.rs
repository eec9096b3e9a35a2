//! Set-reconciliation operations over tries

mod diff;

pub use diff::diff;
