//! Read views served by the query layer.

pub mod summary;
pub mod visitor;

pub use summary::PointsSummary;
pub use visitor::PresentVisitor;
