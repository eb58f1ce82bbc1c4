pub mod shift;
pub mod slots;

pub use shift::ShiftService;
pub use slots::SlotService;
