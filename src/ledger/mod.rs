mod entry;
mod store;

pub use entry::LedgerEntry;
pub use store::{Scope, Session};
