use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Out-patient or in-patient visit. The code doubles as the Visit ID prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VisitType {
    Opd,
    Ipd,
}

impl VisitType {
    pub fn code(&self) -> &'static str {
        match self {
            VisitType::Opd => "OPD",
            VisitType::Ipd => "IPD",
        }
    }
}

impl fmt::Display for VisitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for VisitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPD" => Ok(VisitType::Opd),
            "IPD" => Ok(VisitType::Ipd),
            other => Err(format!("Unknown visit type: {}", other)),
        }
    }
}
