use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde_json::json;
use tracing::{debug, error, info, warn};

use shared_database::supabase::SupabaseClient;
use shared_utils::identifiers::{format_uhid, hospital_prefix, year_code};

use crate::models::PatientError;

/// Postgres function performing the increment-or-create on `uhid_sequences`.
pub const NEXT_UHID_SEQUENCE_FN: &str = "next_uhid_sequence";

/// Largest sequence that still fits the three-digit suffix.
const PADDED_SEQUENCE_MAX: i64 = 999;

pub struct UhidService {
    supabase: Arc<SupabaseClient>,
}

impl UhidService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn generate_uhid(&self, hospital_name: &str, auth_token: &str) -> Result<String, PatientError> {
        self.generate_uhid_at(hospital_name, Utc::now(), auth_token).await
    }

    /// Allocates the next UHID for the year of `now`. Every call consumes a
    /// sequence number, even if the caller later fails to persist the patient.
    pub async fn generate_uhid_at(
        &self,
        hospital_name: &str,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<String, PatientError> {
        let prefix = hospital_prefix(hospital_name)?;
        let year_code = year_code(now.year());

        let sequence = self.next_sequence(&year_code, auth_token).await?;
        if sequence > PADDED_SEQUENCE_MAX {
            warn!("UHID sequence for year {} passed {}: now {}", year_code, PADDED_SEQUENCE_MAX, sequence);
        }

        let uhid = format_uhid(&prefix, &year_code, sequence)?;
        info!("Generated UHID {}", uhid);
        Ok(uhid)
    }

    async fn next_sequence(&self, year_code: &str, auth_token: &str) -> Result<i64, PatientError> {
        debug!("Incrementing UHID sequence for year code {}", year_code);

        self.supabase
            .rpc::<i64>(
                NEXT_UHID_SEQUENCE_FN,
                Some(auth_token),
                json!({ "p_year_code": year_code }),
            )
            .await
            .map_err(|e| {
                error!("UHID sequence increment failed for {}: {}", year_code, e);
                PatientError::UhidGeneration(e.to_string())
            })
    }
}
