use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::SchedulingError;
use crate::types::{Appointment, AuditLogEntry, RepairStatus};

/// Turnaround stamped as the estimated completion when work starts without
/// an explicit estimate.
pub const DEFAULT_TURNAROUND_DAYS: i64 = 3;

impl RepairStatus {
    /// The transition table. This is the single source of truth for the
    /// repair lifecycle; nothing else in the crate decides reachability.
    pub fn allowed_transitions(self) -> &'static [RepairStatus] {
        use RepairStatus::*;
        match self {
            AwaitingCheckIn => &[CheckedIn, Cancelled],
            CheckedIn => &[Diagnosed, Cancelled],
            Diagnosed => &[Approved, Cancelled],
            Approved => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed => &[Delivered],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: RepairStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

/// The audit entry written when an appointment is first booked.
pub fn initial_entry(appointment_id: Uuid, now: DateTime<Utc>) -> AuditLogEntry {
    AuditLogEntry {
        appointment_id,
        prior_status: None,
        new_status: RepairStatus::AwaitingCheckIn,
        note: None,
        recorded_at: now,
    }
}

/// Applies one lifecycle step in place and returns the audit entry the
/// caller must persist together with the appointment. A rejected transition
/// leaves the appointment untouched and produces no entry.
pub fn apply_transition(
    appointment: &mut Appointment,
    new_status: RepairStatus,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<AuditLogEntry, SchedulingError> {
    let from = appointment.status;
    if !from.can_transition_to(new_status) {
        return Err(SchedulingError::InvalidTransition {
            from,
            to: new_status,
        });
    }

    appointment.status = new_status;
    if new_status == RepairStatus::Diagnosed && appointment.diagnosis_notes.is_none() {
        appointment.diagnosis_notes = note.clone();
    }
    if new_status == RepairStatus::InProgress && appointment.estimated_completion.is_none() {
        appointment.estimated_completion = Some(now + Duration::days(DEFAULT_TURNAROUND_DAYS));
    }
    if new_status == RepairStatus::Completed && appointment.actual_completion.is_none() {
        appointment.actual_completion = Some(now);
    }
    appointment.version += 1;

    Ok(AuditLogEntry {
        appointment_id: appointment.id,
        prior_status: Some(from),
        new_status,
        note,
        recorded_at: now,
    })
}
