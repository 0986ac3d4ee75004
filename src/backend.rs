use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::SchedulingError;
use crate::types::{
    Appointment, AuditLogEntry, BookingOrder, ExclusionDate, RepairStatus, SlotAvailability,
    SlotTemplate, TemplateRemoval,
};

/// Write-side policy knobs shared by every backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogPolicy {
    /// Whether `upsert_template` rejects windows that overlap an existing
    /// one for the same weekday and service type. Off by default: staggered
    /// overlapping capacity is a legitimate catalog shape.
    pub reject_overlapping_windows: bool,
}

/// Storage seam of the scheduling core. Implementations must make `book`,
/// `reschedule` and `transition` atomic: the capacity check and the insert
/// (or the version check and the update) happen as one unit, so concurrent
/// callers cannot both get past the limit.
pub trait SchedulingBackend: Clone + Send + Sync + 'static {
    fn list_templates(
        &self,
        service_type: Option<&str>,
    ) -> Result<Vec<SlotTemplate>, SchedulingError>;
    fn upsert_template(&self, template: SlotTemplate) -> Result<SlotTemplate, SchedulingError>;
    fn set_template_enabled(
        &self,
        template_id: Uuid,
        enabled: bool,
    ) -> Result<(), SchedulingError>;
    fn remove_template(&self, template_id: Uuid) -> Result<TemplateRemoval, SchedulingError>;

    fn list_exclusions(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExclusionDate>, SchedulingError>;
    fn add_exclusion(
        &self,
        date: NaiveDate,
        reason: String,
    ) -> Result<ExclusionDate, SchedulingError>;
    fn remove_exclusion(&self, date: NaiveDate) -> Result<(), SchedulingError>;

    fn get_availability(
        &self,
        date: NaiveDate,
        service_type: &str,
    ) -> Result<Vec<SlotAvailability>, SchedulingError>;

    fn book(&self, order: BookingOrder) -> Result<Appointment, SchedulingError>;
    fn reschedule(
        &self,
        appointment_id: Uuid,
        new_template_id: Uuid,
        new_date: NaiveDate,
    ) -> Result<Appointment, SchedulingError>;
    fn transition(
        &self,
        appointment_id: Uuid,
        new_status: RepairStatus,
        note: Option<String>,
    ) -> Result<Appointment, SchedulingError>;

    fn appointment(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError>;
    fn list_appointments(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>, SchedulingError>;
    fn history(&self, appointment_id: Uuid) -> Result<Vec<AuditLogEntry>, SchedulingError>;
}
