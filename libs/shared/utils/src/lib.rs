pub mod extractor;
pub mod identifiers;
pub mod jwt;
pub mod test_utils;

pub use identifiers::{
    IdentifierError, extract_uhid_from_visit_id, validate_uhid, validate_visit_id,
};
