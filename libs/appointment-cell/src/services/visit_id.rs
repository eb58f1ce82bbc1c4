use std::sync::Arc;

use tracing::debug;

use shared_database::supabase::SupabaseClient;
use shared_models::VisitType;
use shared_utils::identifiers::format_visit_id;
use shared_utils::{validate_uhid, IdentifierError};

use crate::models::AppointmentError;

/// Derives Visit IDs from the patient's appointment history. The sequence is
/// the number of earlier visits of the same type plus one, so it is only as
/// safe as the `(uhid, visit_id)` unique index that backs it. Visit IDs leave
/// out the patient's sequence digits and repeat across patients of the same
/// hospital and year; they are unique per patient.
pub struct VisitIdService {
    supabase: Arc<SupabaseClient>,
}

impl VisitIdService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn generate_visit_id(
        &self,
        uhid: &str,
        visit_type: VisitType,
        auth_token: &str,
    ) -> Result<String, AppointmentError> {
        let uhid = uhid.trim();
        if uhid.is_empty() {
            return Err(IdentifierError::EmptyUhid.into());
        }
        if !validate_uhid(uhid) {
            return Err(IdentifierError::MalformedUhid(uhid.to_string()).into());
        }

        let previous = self.count_visits(uhid, visit_type, auth_token).await?;
        let visit_id = format_visit_id(visit_type, uhid, previous + 1)?;

        debug!("Next {} visit for {} is {}", visit_type, uhid, visit_id);
        Ok(visit_id)
    }

    /// Appointments of `visit_type` already recorded for the patient, any status.
    pub async fn count_visits(
        &self,
        uhid: &str,
        visit_type: VisitType,
        auth_token: &str,
    ) -> Result<u64, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?select=id&uhid=eq.{}&visit_type=eq.{}",
            uhid, visit_type
        );

        self.supabase
            .count(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }
}
