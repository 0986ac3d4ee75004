use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::types::{ExclusionDate, SlotAvailability, SlotTemplate};

/// Resolves the bookable slots for one date and service type.
///
/// Exclusions are absolute: an excluded date yields nothing no matter how
/// much capacity the templates carry. Slots whose capacity is exhausted are
/// still reported with zero remaining. The result is advisory only; `book`
/// re-checks capacity under its own serialization before committing.
pub fn resolve(
    date: NaiveDate,
    service_type: &str,
    templates: &[SlotTemplate],
    exclusion: Option<&ExclusionDate>,
    booked: &HashMap<Uuid, i64>,
) -> Vec<SlotAvailability> {
    if exclusion.is_some() {
        return Vec::new();
    }

    let mut slots: Vec<SlotAvailability> = templates
        .iter()
        .filter(|template| {
            template.enabled
                && template.service_type == service_type
                && template.covers_date(date)
        })
        .map(|template| {
            let count = booked.get(&template.id).copied().unwrap_or(0);
            SlotAvailability {
                remaining_capacity: (i64::from(template.max_appointments) - count).max(0) as i32,
                template: template.clone(),
            }
        })
        .collect();
    slots.sort_by_key(|slot| slot.template.start_time);
    slots
}
