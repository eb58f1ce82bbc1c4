use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => vec![],
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduled_can_finish_either_way() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Scheduled, AppointmentStatus::Completed)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Scheduled, AppointmentStatus::Cancelled)
            .is_ok());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let lifecycle = AppointmentLifecycleService::new();

        for terminal in [AppointmentStatus::Completed, AppointmentStatus::Cancelled] {
            assert!(lifecycle.get_valid_transitions(terminal).is_empty());
            assert!(matches!(
                lifecycle.validate_status_transition(terminal, AppointmentStatus::Scheduled),
                Err(AppointmentError::InvalidStatusTransition { .. })
            ));
        }
    }

    #[test]
    fn test_scheduled_to_scheduled_is_rejected() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Scheduled, AppointmentStatus::Scheduled)
            .is_err());
    }
}
