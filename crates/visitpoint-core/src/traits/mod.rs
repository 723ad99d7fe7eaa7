//! Collaborator traits defined in `visitpoint-core` and implemented by
//! other crates (or by the host application).

pub mod cache;
pub mod clock;
pub mod identity;
pub mod persistence;

pub use cache::CacheProvider;
pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{FixedIdentity, IdentityProvider};
pub use persistence::{PersistenceProvider, UpdateFn};
