//! Read views.

pub mod service;

pub use service::QueryService;
