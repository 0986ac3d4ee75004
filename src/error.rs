use chrono::NaiveDate;
use uuid::Uuid;

use crate::types::RepairStatus;

/// Everything the scheduling core can refuse to do, as typed results.
/// Preconditions are re-checked at commit time, so these are returned from
/// the write path even when an earlier availability read looked fine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulingError {
    #[error("slot {template_id} has no remaining capacity on {date}")]
    SlotFull { template_id: Uuid, date: NaiveDate },

    #[error("{date} is not bookable: {reason}")]
    DateExcluded { date: NaiveDate, reason: String },

    #[error("slot template {template_id} is disabled or does not offer the requested service")]
    TemplateUnavailable { template_id: Uuid },

    #[error("cannot move a repair from {from} to {to}")]
    InvalidTransition {
        from: RepairStatus,
        to: RepairStatus,
    },

    /// Lost a concurrent-write race. The only error callers are expected to
    /// retry automatically.
    #[error("concurrent update conflict, retry the request")]
    Conflict,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl SchedulingError {
    /// Stable machine-readable code carried in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            SchedulingError::SlotFull { .. } => "slot_full",
            SchedulingError::DateExcluded { .. } => "date_excluded",
            SchedulingError::TemplateUnavailable { .. } => "template_unavailable",
            SchedulingError::InvalidTransition { .. } => "invalid_transition",
            SchedulingError::Conflict => "conflict",
            SchedulingError::NotFound(_) => "not_found",
            SchedulingError::Validation(_) => "validation",
            SchedulingError::Storage(_) => "storage",
        }
    }
}
