use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use doctor_cell::services::SlotService;
use doctor_cell::{conflict_tolerance, conflicts_with};
use shared_database::supabase::SupabaseClient;

use crate::models::AppointmentError;

/// Applies the same ±7.5 minute window the slot listing uses, so a time
/// offered as free is never refused here.
pub struct ConflictDetectionService {
    slots: SlotService,
}

impl ConflictDetectionService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            slots: SlotService::with_client(supabase),
        }
    }

    pub async fn check_conflicts(
        &self,
        doctor_id: Uuid,
        scheduled_at: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let tolerance = conflict_tolerance();
        debug!("Checking conflicts for doctor {} at {}", doctor_id, scheduled_at);

        let booked = self.slots
            .booked_times(
                &doctor_id.to_string(),
                scheduled_at - tolerance,
                scheduled_at + tolerance,
                auth_token,
            )
            .await?;

        if conflicts_with(scheduled_at, &booked) {
            warn!("Conflict detected for doctor {} at {}", doctor_id, scheduled_at);
            return Err(AppointmentError::ConflictDetected);
        }

        Ok(())
    }
}
