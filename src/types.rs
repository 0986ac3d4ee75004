use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::SchedulingError;

/// A recurring weekly availability window with fixed capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotTemplate {
    pub id: Uuid,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_appointments: i32,
    pub service_type: String,
    pub enabled: bool,
}

impl SlotTemplate {
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        date.weekday().num_days_from_sunday() as i16 == self.day_of_week
    }

    /// Two windows collide when they share a weekday and service type and
    /// their [start, end) ranges intersect.
    pub fn overlaps(&self, other: &SlotTemplate) -> bool {
        self.id != other.id
            && self.day_of_week == other.day_of_week
            && self.service_type == other.service_type
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }

    pub fn validate(&self) -> Result<(), SchedulingError> {
        if !(0..=6).contains(&self.day_of_week) {
            return Err(SchedulingError::Validation(format!(
                "day_of_week must be 0 (Sunday) through 6 (Saturday), got {}",
                self.day_of_week
            )));
        }
        if self.start_time >= self.end_time {
            return Err(SchedulingError::Validation(format!(
                "window start {} must come before its end {}",
                self.start_time, self.end_time
            )));
        }
        if self.max_appointments < 1 {
            return Err(SchedulingError::Validation(
                "max_appointments must be at least 1".into(),
            ));
        }
        if self.service_type.is_empty() {
            return Err(SchedulingError::Validation(
                "service_type must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// A calendar date on which every slot template is suspended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionDate {
    pub id: Uuid,
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Service,
    Part,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Service => "service",
            ItemKind::Part => "part",
        }
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "service" => Ok(ItemKind::Service),
            "part" => Ok(ItemKind::Part),
            other => Err(format!("unknown item kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentItem {
    pub id: Uuid,
    pub kind: ItemKind,
    pub description: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

/// Lifecycle of a repair order. Which moves are legal lives in the
/// transition table in `workflow.rs`; this enum only carries identity and
/// display metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    AwaitingCheckIn,
    CheckedIn,
    Diagnosed,
    Approved,
    InProgress,
    Completed,
    Delivered,
    Cancelled,
}

impl RepairStatus {
    /// Every status in lifecycle order.
    pub const ALL: [RepairStatus; 8] = [
        RepairStatus::AwaitingCheckIn,
        RepairStatus::CheckedIn,
        RepairStatus::Diagnosed,
        RepairStatus::Approved,
        RepairStatus::InProgress,
        RepairStatus::Completed,
        RepairStatus::Delivered,
        RepairStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RepairStatus::AwaitingCheckIn => "awaiting_check_in",
            RepairStatus::CheckedIn => "checked_in",
            RepairStatus::Diagnosed => "diagnosed",
            RepairStatus::Approved => "approved",
            RepairStatus::InProgress => "in_progress",
            RepairStatus::Completed => "completed",
            RepairStatus::Delivered => "delivered",
            RepairStatus::Cancelled => "cancelled",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RepairStatus::AwaitingCheckIn => "#9e9e9e",
            RepairStatus::CheckedIn => "#2196f3",
            RepairStatus::Diagnosed => "#00bcd4",
            RepairStatus::Approved => "#673ab7",
            RepairStatus::InProgress => "#ff9800",
            RepairStatus::Completed => "#4caf50",
            RepairStatus::Delivered => "#388e3c",
            RepairStatus::Cancelled => "#f44336",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RepairStatus::AwaitingCheckIn => "Booked, waiting for the device to arrive",
            RepairStatus::CheckedIn => "Device received at the workshop",
            RepairStatus::Diagnosed => "Fault diagnosed, quote prepared",
            RepairStatus::Approved => "Customer approved the quote",
            RepairStatus::InProgress => "Repair in progress",
            RepairStatus::Completed => "Repair finished, ready for handover",
            RepairStatus::Delivered => "Returned to the customer",
            RepairStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for RepairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepairStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "awaiting_check_in" => Ok(RepairStatus::AwaitingCheckIn),
            "checked_in" => Ok(RepairStatus::CheckedIn),
            "diagnosed" => Ok(RepairStatus::Diagnosed),
            "approved" => Ok(RepairStatus::Approved),
            "in_progress" => Ok(RepairStatus::InProgress),
            "completed" => Ok(RepairStatus::Completed),
            "delivered" => Ok(RepairStatus::Delivered),
            "cancelled" => Ok(RepairStatus::Cancelled),
            other => Err(format!("unknown repair status '{other}'")),
        }
    }
}

/// One customer's booking against a slot template on a specific date.
///
/// Never hard-deleted: cancellation is a terminal status. The status field is
/// written exclusively through `workflow::apply_transition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub customer_ref: Uuid,
    pub template_id: Uuid,
    /// Copied from the slot template at booking time so later template edits
    /// cannot change what was sold.
    pub service_type: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub status: RepairStatus,
    pub problem_description: String,
    pub items: Vec<AppointmentItem>,
    pub diagnosis_notes: Option<String>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub actual_completion: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped on every mutation.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Derived, never stored, so it cannot drift from the line items.
    pub fn total_amount_cents(&self) -> i64 {
        self.items
            .iter()
            .map(|item| i64::from(item.quantity) * item.unit_price_cents)
            .sum()
    }
}

/// A booking request as accepted by `SchedulingBackend::book`.
#[derive(Debug, Clone)]
pub struct BookingOrder {
    pub customer_ref: Uuid,
    pub template_id: Uuid,
    pub date: NaiveDate,
    pub service_type: String,
    pub problem_description: String,
    pub items: Vec<NewItem>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub kind: ItemKind,
    pub description: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

impl BookingOrder {
    pub fn validate(&self) -> Result<(), SchedulingError> {
        if self.problem_description.trim().is_empty() {
            return Err(SchedulingError::Validation(
                "a problem description is required".into(),
            ));
        }
        if self.service_type.is_empty() {
            return Err(SchedulingError::Validation(
                "service_type must not be empty".into(),
            ));
        }
        for item in &self.items {
            if item.quantity < 1 {
                return Err(SchedulingError::Validation(
                    "line item quantity must be at least 1".into(),
                ));
            }
            if item.unit_price_cents < 0 {
                return Err(SchedulingError::Validation(
                    "line item unit price must not be negative".into(),
                ));
            }
            if item.description.trim().is_empty() {
                return Err(SchedulingError::Validation(
                    "line item description must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// One append-only record of a status change. Ordering within an
/// appointment is the order of appends; entries carry no identity of their
/// own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub appointment_id: Uuid,
    /// None only for the entry written at booking time.
    pub prior_status: Option<RepairStatus>,
    pub new_status: RepairStatus,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// A slot template paired with how many bookings it can still take on a
/// given date. Zero-remaining slots are reported, not hidden, so callers can
/// render them as full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub template: SlotTemplate,
    pub remaining_capacity: i32,
}

/// Outcome of removing a slot template: templates still referenced by
/// future bookings are disabled instead of deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateRemoval {
    Deleted,
    Disabled,
}
