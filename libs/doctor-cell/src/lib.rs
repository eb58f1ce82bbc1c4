pub mod models;
pub mod handlers;
pub mod router;
pub mod services;

pub use models::*;
pub use router::doctor_routes;
pub use services::{ShiftService, SlotService};
pub use services::slots::{conflict_tolerance, conflicts_with, shift_covers, shift_window};
