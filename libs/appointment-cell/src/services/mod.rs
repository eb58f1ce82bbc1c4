pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod visit_id;

pub use booking::AppointmentBookingService;
pub use conflict::ConflictDetectionService;
pub use lifecycle::AppointmentLifecycleService;
pub use visit_id::VisitIdService;
