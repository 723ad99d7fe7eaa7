//! Visit session entities.

pub mod event;
pub mod model;
pub mod status;

pub use event::{SessionEvent, Transition};
pub use model::Session;
pub use status::{CloseReason, SessionStatus};
