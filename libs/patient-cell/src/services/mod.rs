pub mod patient;
pub mod uhid;

pub use patient::PatientService;
pub use uhid::UhidService;
