//! Formatting and validation of hospital identifiers.
//!
//! A UHID reads `TR` + two-letter hospital prefix + two-digit year code +
//! sequence (`TRAV25001`). The sequence is zero-padded to three digits and
//! grows wider once a year passes 999 registrations, so the scope part
//! (`TRAV25`) is always the first six characters.
//!
//! A Visit ID reads visit type + UHID scope + per-type visit number
//! (`OPDTRAV253`). The patient's own sequence digits are not part of it.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use shared_models::VisitType;

pub const UHID_TAG: &str = "TR";
pub const UHID_SCOPE_LEN: usize = 6;
pub const UHID_SEQUENCE_WIDTH: usize = 3;

/// Sequence digits substituted when a UHID is rebuilt from a Visit ID.
pub const RECONSTRUCTED_SEQUENCE: &str = "001";

static UHID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TR[A-Z]{2}\d{2}\d{3,}$").expect("UHID pattern compiles"));

static VISIT_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(OPD|IPD)(TR[A-Z]{2}\d{2})(\d+)$").expect("visit id pattern compiles")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Hospital name must start with two letters: '{0}'")]
    InvalidHospitalName(String),

    #[error("UHID is required")]
    EmptyUhid,

    #[error("Malformed UHID: {0}")]
    MalformedUhid(String),

    #[error("Sequence numbers start at 1, got {0}")]
    InvalidSequence(i64),
}

/// First two characters of the hospital name, uppercased.
pub fn hospital_prefix(hospital_name: &str) -> Result<String, IdentifierError> {
    let prefix: String = hospital_name.trim_start().chars().take(2).collect();

    if prefix.chars().count() != 2 || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(IdentifierError::InvalidHospitalName(hospital_name.to_string()));
    }

    Ok(prefix.to_ascii_uppercase())
}

/// Two-digit year code, e.g. 2025 -> "25".
pub fn year_code(year: i32) -> String {
    format!("{:02}", year.rem_euclid(100))
}

pub fn format_uhid(hospital_prefix: &str, year_code: &str, sequence: i64) -> Result<String, IdentifierError> {
    if sequence < 1 {
        return Err(IdentifierError::InvalidSequence(sequence));
    }

    Ok(format!(
        "{}{}{}{:0width$}",
        UHID_TAG,
        hospital_prefix,
        year_code,
        sequence,
        width = UHID_SEQUENCE_WIDTH
    ))
}

/// Hospital/year scope of a UHID (`TRAV25001` -> `TRAV25`).
pub fn uhid_scope(uhid: &str) -> Result<&str, IdentifierError> {
    if uhid.trim().is_empty() {
        return Err(IdentifierError::EmptyUhid);
    }
    if !validate_uhid(uhid) {
        return Err(IdentifierError::MalformedUhid(uhid.to_string()));
    }

    Ok(&uhid[..UHID_SCOPE_LEN])
}

pub fn format_visit_id(visit_type: VisitType, uhid: &str, visit_sequence: u64) -> Result<String, IdentifierError> {
    if visit_sequence == 0 {
        return Err(IdentifierError::InvalidSequence(0));
    }

    let scope = uhid_scope(uhid)?;
    Ok(format!("{}{}{}", visit_type.code(), scope, visit_sequence))
}

pub fn validate_uhid(candidate: &str) -> bool {
    UHID_PATTERN.is_match(candidate)
}

pub fn validate_visit_id(candidate: &str) -> bool {
    VISIT_ID_PATTERN.is_match(candidate)
}

/// Rebuilds a UHID from a Visit ID. Only the hospital/year scope survives
/// the round trip; the sequence is always `001`.
pub fn extract_uhid_from_visit_id(visit_id: &str) -> Option<String> {
    let captures = VISIT_ID_PATTERN.captures(visit_id)?;
    let scope = captures.get(2)?.as_str();

    Some(format!("{}{}", scope, RECONSTRUCTED_SEQUENCE))
}

/// Visit type encoded in a well-formed Visit ID.
pub fn visit_type_of(visit_id: &str) -> Option<VisitType> {
    let captures = VISIT_ID_PATTERN.captures(visit_id)?;
    captures.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hospital_prefix() {
        assert_eq!(hospital_prefix("Avenue Hospital").unwrap(), "AV");
        assert_eq!(hospital_prefix("st. mary").unwrap(), "ST");
        assert_eq!(
            hospital_prefix("A"),
            Err(IdentifierError::InvalidHospitalName("A".to_string()))
        );
        assert!(hospital_prefix("").is_err());
        assert!(hospital_prefix("1st Care").is_err());
        assert!(hospital_prefix("Ünited").is_err());
    }

    #[test]
    fn test_year_code() {
        assert_eq!(year_code(2025), "25");
        assert_eq!(year_code(2100), "00");
        assert_eq!(year_code(2009), "09");
    }

    #[test]
    fn test_format_uhid_pads_to_three_digits() {
        assert_eq!(format_uhid("AV", "25", 1).unwrap(), "TRAV25001");
        assert_eq!(format_uhid("AV", "25", 42).unwrap(), "TRAV25042");
        assert_eq!(format_uhid("AV", "25", 999).unwrap(), "TRAV25999");
        assert_eq!(format_uhid("AV", "25", 0), Err(IdentifierError::InvalidSequence(0)));
    }

    #[test]
    fn test_wide_sequences_stay_valid() {
        let uhid = format_uhid("AV", "25", 1000).unwrap();
        assert_eq!(uhid, "TRAV251000");
        assert!(validate_uhid(&uhid));
        assert_eq!(uhid_scope(&uhid).unwrap(), "TRAV25");
        assert_eq!(format_visit_id(VisitType::Opd, &uhid, 2).unwrap(), "OPDTRAV252");
    }

    #[test]
    fn test_validate_uhid() {
        for seq in [1, 17, 999] {
            assert!(validate_uhid(&format_uhid("AV", "25", seq).unwrap()));
        }

        assert!(!validate_uhid("INVALID"));
        assert!(!validate_uhid("trav25001"));
        assert!(!validate_uhid("TRav25001"));
        assert!(!validate_uhid("TRAV2501"));
        assert!(!validate_uhid("TRAV5001"));
        assert!(!validate_uhid("XXAV25001"));
        assert!(!validate_uhid(" TRAV25001"));
        assert!(!validate_uhid(""));
    }

    #[test]
    fn test_uhid_scope() {
        assert_eq!(uhid_scope("TRAV25001").unwrap(), "TRAV25");
        assert_eq!(uhid_scope(""), Err(IdentifierError::EmptyUhid));
        assert_eq!(uhid_scope("   "), Err(IdentifierError::EmptyUhid));
        assert_eq!(
            uhid_scope("BAD"),
            Err(IdentifierError::MalformedUhid("BAD".to_string()))
        );
    }

    #[test]
    fn test_format_visit_id() {
        assert_eq!(format_visit_id(VisitType::Opd, "TRAV25001", 1).unwrap(), "OPDTRAV251");
        assert_eq!(format_visit_id(VisitType::Ipd, "TRAV25007", 12).unwrap(), "IPDTRAV2512");
        assert_eq!(
            format_visit_id(VisitType::Opd, "", 1),
            Err(IdentifierError::EmptyUhid)
        );
        assert!(format_visit_id(VisitType::Opd, "TRAV25001", 0).is_err());
    }

    #[test]
    fn test_validate_visit_id() {
        assert!(validate_visit_id("OPDTRAV251"));
        assert!(validate_visit_id("IPDTRAV25123"));
        assert!(!validate_visit_id("ERTRAV251"));
        assert!(!validate_visit_id("OPDTRAV25"));
        assert!(!validate_visit_id("opdTRAV251"));
        assert!(!validate_visit_id("OPDTRAV25001X"));
    }

    #[test]
    fn test_extract_uhid_from_visit_id() {
        assert_eq!(extract_uhid_from_visit_id("OPDTRAV253"), Some("TRAV25001".to_string()));
        assert_eq!(extract_uhid_from_visit_id("IPDTRXY0942"), Some("TRXY09001".to_string()));
        assert_eq!(extract_uhid_from_visit_id("INVALID"), None);
        assert_eq!(extract_uhid_from_visit_id(""), None);

        for visit_id in ["OPDTRAV251", "IPDTRAV2599", "OPDTRZZ001234"] {
            let uhid = extract_uhid_from_visit_id(visit_id).unwrap();
            assert!(validate_uhid(&uhid), "{} rebuilt into invalid {}", visit_id, uhid);
        }
    }

    #[test]
    fn test_visit_type_of() {
        assert_eq!(visit_type_of("IPDTRAV251"), Some(VisitType::Ipd));
        assert_eq!(visit_type_of("OPDTRAV251"), Some(VisitType::Opd));
        assert_eq!(visit_type_of("XYZ"), None);
    }
}
