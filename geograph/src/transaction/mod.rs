//! Transaction handles and providers.

mod transaction;

pub use transaction::*;
