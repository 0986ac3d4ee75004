use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::backend::SchedulingBackend;
use crate::error::SchedulingError;
use crate::types::{
    Appointment, AppointmentItem, AuditLogEntry, BookingOrder, ExclusionDate, ItemKind,
    RepairStatus, SlotAvailability, SlotTemplate, TemplateRemoval,
};

pub fn example_template() -> SlotTemplate {
    SlotTemplate {
        id: Uuid::new_v4(),
        day_of_week: 1,
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        max_appointments: 2,
        service_type: "repair".into(),
        enabled: true,
    }
}

pub fn example_appointment() -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        customer_ref: Uuid::new_v4(),
        template_id: Uuid::new_v4(),
        service_type: "repair".into(),
        date: NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        status: RepairStatus::AwaitingCheckIn,
        problem_description: "does not charge".into(),
        items: vec![AppointmentItem {
            id: Uuid::new_v4(),
            kind: ItemKind::Service,
            description: "diagnostics".into(),
            quantity: 1,
            unit_price_cents: 2_500,
        }],
        diagnosis_notes: None,
        estimated_completion: None,
        actual_completion: None,
        version: 0,
        created_at: Utc::now(),
    }
}

pub struct MockSchedulingBackendInner {
    /// When set, every backend call fails with a clone of this error.
    pub failure: Mutex<Option<SchedulingError>>,
    pub calls_to_list_templates: AtomicU64,
    pub calls_to_upsert_template: AtomicU64,
    pub calls_to_set_template_enabled: AtomicU64,
    pub calls_to_remove_template: AtomicU64,
    pub calls_to_list_exclusions: AtomicU64,
    pub calls_to_add_exclusion: AtomicU64,
    pub calls_to_remove_exclusion: AtomicU64,
    pub calls_to_get_availability: AtomicU64,
    pub calls_to_book: AtomicU64,
    pub calls_to_reschedule: AtomicU64,
    pub calls_to_transition: AtomicU64,
    pub calls_to_appointment: AtomicU64,
    pub calls_to_list_appointments: AtomicU64,
    pub calls_to_history: AtomicU64,
    pub availability: Mutex<Vec<SlotAvailability>>,
    pub appointments: Mutex<Vec<Appointment>>,
    pub history: Mutex<Vec<AuditLogEntry>>,
}

#[derive(Clone)]
pub struct MockSchedulingBackend(pub Arc<MockSchedulingBackendInner>);

impl MockSchedulingBackend {
    pub fn new() -> Self {
        Self(Arc::new(MockSchedulingBackendInner {
            failure: Mutex::default(),
            calls_to_list_templates: AtomicU64::default(),
            calls_to_upsert_template: AtomicU64::default(),
            calls_to_set_template_enabled: AtomicU64::default(),
            calls_to_remove_template: AtomicU64::default(),
            calls_to_list_exclusions: AtomicU64::default(),
            calls_to_add_exclusion: AtomicU64::default(),
            calls_to_remove_exclusion: AtomicU64::default(),
            calls_to_get_availability: AtomicU64::default(),
            calls_to_book: AtomicU64::default(),
            calls_to_reschedule: AtomicU64::default(),
            calls_to_transition: AtomicU64::default(),
            calls_to_appointment: AtomicU64::default(),
            calls_to_list_appointments: AtomicU64::default(),
            calls_to_history: AtomicU64::default(),
            availability: Mutex::default(),
            appointments: Mutex::default(),
            history: Mutex::default(),
        }))
    }

    pub fn fail_with(&self, err: SchedulingError) {
        *self.0.failure.lock().unwrap() = Some(err);
    }

    fn check_failure(&self) -> Result<(), SchedulingError> {
        match &*self.0.failure.lock().unwrap() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn canned_appointment(&self) -> Appointment {
        self.0
            .appointments
            .lock()
            .unwrap()
            .first()
            .cloned()
            .unwrap_or_else(example_appointment)
    }
}

impl SchedulingBackend for MockSchedulingBackend {
    fn list_templates(
        &self,
        _service_type: Option<&str>,
    ) -> Result<Vec<SlotTemplate>, SchedulingError> {
        self.0.calls_to_list_templates.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(vec![example_template()])
    }

    fn upsert_template(&self, template: SlotTemplate) -> Result<SlotTemplate, SchedulingError> {
        self.0.calls_to_upsert_template.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(template)
    }

    fn set_template_enabled(
        &self,
        _template_id: Uuid,
        _enabled: bool,
    ) -> Result<(), SchedulingError> {
        self.0
            .calls_to_set_template_enabled
            .fetch_add(1, Ordering::SeqCst);
        self.check_failure()
    }

    fn remove_template(&self, _template_id: Uuid) -> Result<TemplateRemoval, SchedulingError> {
        self.0.calls_to_remove_template.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(TemplateRemoval::Deleted)
    }

    fn list_exclusions(
        &self,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<ExclusionDate>, SchedulingError> {
        self.0.calls_to_list_exclusions.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(Vec::new())
    }

    fn add_exclusion(
        &self,
        date: NaiveDate,
        reason: String,
    ) -> Result<ExclusionDate, SchedulingError> {
        self.0.calls_to_add_exclusion.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(ExclusionDate {
            id: Uuid::new_v4(),
            date,
            reason,
        })
    }

    fn remove_exclusion(&self, _date: NaiveDate) -> Result<(), SchedulingError> {
        self.0.calls_to_remove_exclusion.fetch_add(1, Ordering::SeqCst);
        self.check_failure()
    }

    fn get_availability(
        &self,
        _date: NaiveDate,
        _service_type: &str,
    ) -> Result<Vec<SlotAvailability>, SchedulingError> {
        self.0.calls_to_get_availability.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.0.availability.lock().unwrap().clone())
    }

    fn book(&self, order: BookingOrder) -> Result<Appointment, SchedulingError> {
        self.0.calls_to_book.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let mut appointment = self.canned_appointment();
        appointment.customer_ref = order.customer_ref;
        appointment.template_id = order.template_id;
        appointment.date = order.date;
        appointment.service_type = order.service_type;
        appointment.problem_description = order.problem_description;
        Ok(appointment)
    }

    fn reschedule(
        &self,
        _appointment_id: Uuid,
        new_template_id: Uuid,
        new_date: NaiveDate,
    ) -> Result<Appointment, SchedulingError> {
        self.0.calls_to_reschedule.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let mut appointment = self.canned_appointment();
        appointment.template_id = new_template_id;
        appointment.date = new_date;
        Ok(appointment)
    }

    fn transition(
        &self,
        _appointment_id: Uuid,
        new_status: RepairStatus,
        _note: Option<String>,
    ) -> Result<Appointment, SchedulingError> {
        self.0.calls_to_transition.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let mut appointment = self.canned_appointment();
        appointment.status = new_status;
        Ok(appointment)
    }

    fn appointment(&self, _appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        self.0.calls_to_appointment.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.canned_appointment())
    }

    fn list_appointments(
        &self,
        _date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        self.0
            .calls_to_list_appointments
            .fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.0.appointments.lock().unwrap().clone())
    }

    fn history(&self, _appointment_id: Uuid) -> Result<Vec<AuditLogEntry>, SchedulingError> {
        self.0.calls_to_history.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.0.history.lock().unwrap().clone())
    }
}
