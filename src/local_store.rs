use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::availability;
use crate::backend::{CatalogPolicy, SchedulingBackend};
use crate::error::SchedulingError;
use crate::types::{
    Appointment, AppointmentItem, AuditLogEntry, BookingOrder, ExclusionDate, RepairStatus,
    SlotAvailability, SlotTemplate, TemplateRemoval,
};
use crate::workflow;

#[derive(Debug, Default)]
struct StoreInner {
    templates: HashMap<Uuid, SlotTemplate>,
    exclusions: BTreeMap<NaiveDate, ExclusionDate>,
    appointments: HashMap<Uuid, Appointment>,
    audit_log: Vec<AuditLogEntry>,
}

/// In-memory backend. The single mutex is the serialization point: every
/// operation is one critical section, so the capacity check and the insert
/// cannot interleave with another booking.
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    inner: Arc<Mutex<StoreInner>>,
    policy: CatalogPolicy,
}

impl LocalStore {
    pub fn new(policy: CatalogPolicy) -> Self {
        Self {
            inner: Arc::default(),
            policy,
        }
    }

    /// Seeds a small weekday catalog so a fresh local instance has
    /// something to book against.
    pub fn insert_example_catalog(&self) {
        let mut inner = self.inner.lock().unwrap();
        for day_of_week in 1..=5 {
            for (start_hour, service_type, capacity) in
                [(9, "repair", 3), (11, "repair", 3), (14, "consultation", 1)]
            {
                let id = Uuid::new_v4();
                inner.templates.insert(
                    id,
                    SlotTemplate {
                        id,
                        day_of_week,
                        start_time: NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap(),
                        end_time: NaiveTime::from_hms_opt(start_hour + 1, 0, 0).unwrap(),
                        max_appointments: capacity,
                        service_type: service_type.into(),
                        enabled: true,
                    },
                );
            }
        }
    }
}

impl StoreInner {
    fn booked_count(&self, template_id: Uuid, date: NaiveDate, exclude: Option<Uuid>) -> i64 {
        self.appointments
            .values()
            .filter(|appointment| {
                appointment.template_id == template_id
                    && appointment.date == date
                    && appointment.status != RepairStatus::Cancelled
                    && Some(appointment.id) != exclude
            })
            .count() as i64
    }

    /// The atomic booking precondition: exclusion, template fitness and
    /// remaining capacity, checked in one place for both book and
    /// reschedule. `exclude` drops one appointment from the count so a
    /// reschedule does not compete with itself.
    fn check_destination(
        &self,
        template_id: Uuid,
        date: NaiveDate,
        service_type: &str,
        exclude: Option<Uuid>,
    ) -> Result<&SlotTemplate, SchedulingError> {
        if let Some(exclusion) = self.exclusions.get(&date) {
            return Err(SchedulingError::DateExcluded {
                date,
                reason: exclusion.reason.clone(),
            });
        }
        let template = self
            .templates
            .get(&template_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("slot template {template_id}")))?;
        if !template.enabled || template.service_type != service_type {
            return Err(SchedulingError::TemplateUnavailable { template_id });
        }
        if !template.covers_date(date) {
            return Err(SchedulingError::Validation(format!(
                "{date} does not fall on the slot's weekday"
            )));
        }
        if self.booked_count(template_id, date, exclude) >= i64::from(template.max_appointments) {
            return Err(SchedulingError::SlotFull { template_id, date });
        }
        Ok(template)
    }
}

impl SchedulingBackend for LocalStore {
    fn list_templates(
        &self,
        service_type: Option<&str>,
    ) -> Result<Vec<SlotTemplate>, SchedulingError> {
        let inner = self.inner.lock().unwrap();
        let mut templates: Vec<SlotTemplate> = inner
            .templates
            .values()
            .filter(|template| service_type.is_none_or(|s| template.service_type == s))
            .cloned()
            .collect();
        templates.sort_by_key(|template| (template.day_of_week, template.start_time));
        Ok(templates)
    }

    fn upsert_template(&self, template: SlotTemplate) -> Result<SlotTemplate, SchedulingError> {
        template.validate()?;
        let mut inner = self.inner.lock().unwrap();
        if self.policy.reject_overlapping_windows {
            if let Some(existing) = inner
                .templates
                .values()
                .find(|existing| template.overlaps(existing))
            {
                return Err(SchedulingError::Validation(format!(
                    "window overlaps existing slot {} ({} to {})",
                    existing.id, existing.start_time, existing.end_time
                )));
            }
        }
        inner.templates.insert(template.id, template.clone());
        Ok(template)
    }

    fn set_template_enabled(
        &self,
        template_id: Uuid,
        enabled: bool,
    ) -> Result<(), SchedulingError> {
        let mut inner = self.inner.lock().unwrap();
        let template = inner
            .templates
            .get_mut(&template_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("slot template {template_id}")))?;
        template.enabled = enabled;
        Ok(())
    }

    fn remove_template(&self, template_id: Uuid) -> Result<TemplateRemoval, SchedulingError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.templates.contains_key(&template_id) {
            return Err(SchedulingError::NotFound(format!(
                "slot template {template_id}"
            )));
        }
        let today = Utc::now().date_naive();
        let has_upcoming = inner.appointments.values().any(|appointment| {
            appointment.template_id == template_id
                && appointment.date >= today
                && appointment.status != RepairStatus::Cancelled
        });
        if has_upcoming {
            if let Some(template) = inner.templates.get_mut(&template_id) {
                template.enabled = false;
            }
            info!(template = %template_id, "template still referenced by upcoming bookings, disabled instead of deleted");
            return Ok(TemplateRemoval::Disabled);
        }
        inner.templates.remove(&template_id);
        Ok(TemplateRemoval::Deleted)
    }

    fn list_exclusions(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExclusionDate>, SchedulingError> {
        if from > to {
            return Ok(Vec::new());
        }
        let inner = self.inner.lock().unwrap();
        Ok(inner.exclusions.range(from..=to).map(|(_, e)| e.clone()).collect())
    }

    fn add_exclusion(
        &self,
        date: NaiveDate,
        reason: String,
    ) -> Result<ExclusionDate, SchedulingError> {
        if reason.trim().is_empty() {
            return Err(SchedulingError::Validation(
                "an exclusion needs a reason".into(),
            ));
        }
        let mut inner = self.inner.lock().unwrap();
        // One exclusion per date: a second write for the same date updates
        // the reason instead of duplicating the entry.
        let entry = inner
            .exclusions
            .entry(date)
            .and_modify(|existing| existing.reason = reason.clone())
            .or_insert_with(|| ExclusionDate {
                id: Uuid::new_v4(),
                date,
                reason,
            });
        Ok(entry.clone())
    }

    fn remove_exclusion(&self, date: NaiveDate) -> Result<(), SchedulingError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.exclusions.remove(&date).is_none() {
            return Err(SchedulingError::NotFound(format!("exclusion for {date}")));
        }
        Ok(())
    }

    fn get_availability(
        &self,
        date: NaiveDate,
        service_type: &str,
    ) -> Result<Vec<SlotAvailability>, SchedulingError> {
        let inner = self.inner.lock().unwrap();
        let templates: Vec<SlotTemplate> = inner.templates.values().cloned().collect();
        let mut booked: HashMap<Uuid, i64> = HashMap::new();
        for appointment in inner.appointments.values() {
            if appointment.date == date && appointment.status != RepairStatus::Cancelled {
                *booked.entry(appointment.template_id).or_insert(0) += 1;
            }
        }
        Ok(availability::resolve(
            date,
            service_type,
            &templates,
            inner.exclusions.get(&date),
            &booked,
        ))
    }

    fn book(&self, order: BookingOrder) -> Result<Appointment, SchedulingError> {
        order.validate()?;
        let mut inner = self.inner.lock().unwrap();
        let start_time = inner
            .check_destination(order.template_id, order.date, &order.service_type, None)?
            .start_time;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            customer_ref: order.customer_ref,
            template_id: order.template_id,
            service_type: order.service_type,
            date: order.date,
            start_time,
            status: RepairStatus::AwaitingCheckIn,
            problem_description: order.problem_description,
            items: order
                .items
                .into_iter()
                .map(|item| AppointmentItem {
                    id: Uuid::new_v4(),
                    kind: item.kind,
                    description: item.description,
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price_cents,
                })
                .collect(),
            diagnosis_notes: None,
            estimated_completion: None,
            actual_completion: None,
            version: 0,
            created_at: now,
        };
        inner.audit_log.push(workflow::initial_entry(appointment.id, now));
        inner.appointments.insert(appointment.id, appointment.clone());
        info!(appointment = %appointment.id, slot = %appointment.template_id, date = %appointment.date, "booked repair appointment");
        Ok(appointment)
    }

    fn reschedule(
        &self,
        appointment_id: Uuid,
        new_template_id: Uuid,
        new_date: NaiveDate,
    ) -> Result<Appointment, SchedulingError> {
        let mut inner = self.inner.lock().unwrap();
        let (service_type, status) = {
            let appointment = inner
                .appointments
                .get(&appointment_id)
                .ok_or_else(|| SchedulingError::NotFound(format!("appointment {appointment_id}")))?;
            (appointment.service_type.clone(), appointment.status)
        };
        if status.is_terminal() {
            return Err(SchedulingError::Validation(format!(
                "appointment {appointment_id} is {status} and cannot be rescheduled"
            )));
        }
        let start_time = inner
            .check_destination(new_template_id, new_date, &service_type, Some(appointment_id))?
            .start_time;

        let appointment = inner
            .appointments
            .get_mut(&appointment_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("appointment {appointment_id}")))?;
        appointment.template_id = new_template_id;
        appointment.date = new_date;
        appointment.start_time = start_time;
        appointment.version += 1;
        let updated = appointment.clone();
        info!(appointment = %appointment_id, slot = %new_template_id, date = %new_date, "rescheduled appointment");
        Ok(updated)
    }

    fn transition(
        &self,
        appointment_id: Uuid,
        new_status: RepairStatus,
        note: Option<String>,
    ) -> Result<Appointment, SchedulingError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let appointment = inner
            .appointments
            .get_mut(&appointment_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("appointment {appointment_id}")))?;
        let entry = workflow::apply_transition(appointment, new_status, note, now)?;
        let updated = appointment.clone();
        inner.audit_log.push(entry);
        info!(appointment = %appointment_id, status = %new_status, "repair status updated");
        Ok(updated)
    }

    fn appointment(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        let inner = self.inner.lock().unwrap();
        inner
            .appointments
            .get(&appointment_id)
            .cloned()
            .ok_or_else(|| SchedulingError::NotFound(format!("appointment {appointment_id}")))
    }

    fn list_appointments(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let inner = self.inner.lock().unwrap();
        let mut appointments: Vec<Appointment> = inner
            .appointments
            .values()
            .filter(|appointment| date.is_none_or(|d| appointment.date == d))
            .cloned()
            .collect();
        appointments.sort_by_key(|appointment| {
            (appointment.date, appointment.start_time, appointment.created_at)
        });
        Ok(appointments)
    }

    fn history(&self, appointment_id: Uuid) -> Result<Vec<AuditLogEntry>, SchedulingError> {
        let inner = self.inner.lock().unwrap();
        if !inner.appointments.contains_key(&appointment_id) {
            return Err(SchedulingError::NotFound(format!(
                "appointment {appointment_id}"
            )));
        }
        // The log vec is append-only, so filtering preserves chronology.
        Ok(inner
            .audit_log
            .iter()
            .filter(|entry| entry.appointment_id == appointment_id)
            .cloned()
            .collect())
    }
}
