//! Scanned-code issuing and resolution.

pub mod issuer;
pub mod replay;
pub mod service;

pub use issuer::CodeIssuer;
pub use replay::ReplayGuard;
pub use service::IdentityResolver;
