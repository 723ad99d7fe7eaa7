//! Points ledger entities.

pub mod entry;
pub mod reason;
pub mod stream;

pub use entry::{EntryKind, LedgerEntry};
pub use reason::{PointReason, RewardKind};
pub use stream::UserLedger;
