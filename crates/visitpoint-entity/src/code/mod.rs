//! Scanned QR code entities.

pub mod payload;

pub use payload::{CODE_VERSION, CodePayload, ResolvedCode, ScanIntent};
