pub mod auth;
pub mod error;
pub mod visit;

pub use visit::VisitType;
