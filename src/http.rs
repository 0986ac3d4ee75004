use axum::extract::{Path, Query, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{http::StatusCode, Json, Router};
use chrono::{NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;
use validator::Validate;

use crate::backend::SchedulingBackend;
use crate::error::SchedulingError;
use crate::types::{
    Appointment, AuditLogEntry, BookingOrder, ExclusionDate, ItemKind, NewItem, RepairStatus,
    SlotAvailability, SlotTemplate, TemplateRemoval,
};
use crate::AppState;

lazy_static! {
    static ref SERVICE_TYPE_RE: Regex = Regex::new("^[a-z][a-z0-9_-]*$").unwrap();
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct UpsertTemplateRequest {
    /// Present when editing an existing template.
    id: Option<Uuid>,
    #[validate(range(min = 0, max = 6, message = "day_of_week is 0 (Sunday) through 6 (Saturday)"))]
    day_of_week: i16,
    start_time: NaiveTime,
    end_time: NaiveTime,
    #[validate(range(min = 1))]
    max_appointments: i32,
    #[validate(regex(path = *SERVICE_TYPE_RE, message = "service_type must be a lowercase slug"))]
    service_type: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SetTemplateEnabledRequest {
    id: Uuid,
    enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RemoveTemplateRequest {
    id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct AddExclusionRequest {
    date: NaiveDate,
    #[validate(length(min = 1, message = "a reason is required"))]
    reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RemoveExclusionRequest {
    date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
struct TemplateListQuery {
    service_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AvailabilityQuery {
    date: NaiveDate,
    service_type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ExclusionRangeQuery {
    from: NaiveDate,
    to: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
struct AppointmentListQuery {
    date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct BookAppointmentRequest {
    customer_ref: Uuid,
    slot_id: Uuid,
    date: NaiveDate,
    #[validate(regex(path = *SERVICE_TYPE_RE, message = "service_type must be a lowercase slug"))]
    service_type: String,
    #[validate(length(min = 1, message = "problem_description is required"))]
    problem_description: String,
    #[serde(default)]
    #[validate(nested)]
    items: Vec<LineItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct LineItemRequest {
    kind: ItemKind,
    #[validate(length(min = 1))]
    description: String,
    #[validate(range(min = 1))]
    quantity: i32,
    #[validate(range(min = 0))]
    unit_price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransitionRequest {
    new_status: RepairStatus,
    note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RescheduleRequest {
    slot_id: Uuid,
    date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AvailabilityEntry {
    slot_id: Uuid,
    start_time: NaiveTime,
    end_time: NaiveTime,
    remaining_capacity: i32,
}

impl From<SlotAvailability> for AvailabilityEntry {
    fn from(slot: SlotAvailability) -> Self {
        AvailabilityEntry {
            slot_id: slot.template.id,
            start_time: slot.template.start_time,
            end_time: slot.template.end_time,
            remaining_capacity: slot.remaining_capacity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppointmentView {
    #[serde(flatten)]
    appointment: Appointment,
    total_amount_cents: i64,
}

impl From<Appointment> for AppointmentView {
    fn from(appointment: Appointment) -> Self {
        let total_amount_cents = appointment.total_amount_cents();
        AppointmentView {
            appointment,
            total_amount_cents,
        }
    }
}

/// Workflow legend for status-tracking UIs: progress timelines derive the
/// reached steps from audit history order, this only supplies the labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatusInfo {
    status: RepairStatus,
    color: String,
    description: String,
    terminal: bool,
    allowed_transitions: Vec<RepairStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

fn error_status(err: &SchedulingError) -> StatusCode {
    match err {
        SchedulingError::SlotFull { .. }
        | SchedulingError::DateExcluded { .. }
        | SchedulingError::TemplateUnavailable { .. }
        | SchedulingError::InvalidTransition { .. }
        | SchedulingError::Conflict => StatusCode::CONFLICT,
        SchedulingError::NotFound(_) => StatusCode::NOT_FOUND,
        SchedulingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SchedulingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for SchedulingError {
    fn into_response(self) -> Response {
        let status = error_status(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.code().into(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn validated<T: Validate>(payload: T) -> Result<T, SchedulingError> {
    payload
        .validate()
        .map_err(|err| SchedulingError::Validation(err.to_string()))?;
    Ok(payload)
}

pub async fn start_server<T: SchedulingBackend>(state: AppState<T>, listener: TcpListener) {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/statuses", get(list_statuses))
        .route("/availability", get(get_availability::<T>))
        .route("/appointments", post(book_appointment::<T>))
        .route("/appointments/:id", get(get_appointment::<T>))
        .route("/appointments/:id/status", patch(transition_status::<T>))
        .route("/appointments/:id/history", get(get_history::<T>));

    let admin = Router::new()
        .route(
            "/admin/templates",
            get(list_templates::<T>).post(upsert_template::<T>),
        )
        .route("/admin/templates/enabled", post(set_template_enabled::<T>))
        .route("/admin/templates/remove", post(remove_template::<T>))
        .route(
            "/admin/exclusions",
            get(list_exclusions::<T>).post(add_exclusion::<T>),
        )
        .route("/admin/exclusions/remove", post(remove_exclusion::<T>))
        .route("/admin/appointments", get(list_appointments::<T>))
        .route(
            "/admin/appointments/:id/reschedule",
            post(reschedule_appointment::<T>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth::<T>,
        ));

    let app = Router::new()
        .merge(public)
        .merge(admin)
        .with_state(state)
        .layer(cors);

    axum::serve(listener, app).await.unwrap();
}

async fn admin_auth<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    match request
        .headers()
        .get("x-admin-password")
        .and_then(|value| value.to_str().ok())
    {
        Some(password) if password == state.admin_password => Ok(next.run(request).await),
        Some(_) => Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string())),
        None => Err((StatusCode::UNAUTHORIZED, "Missing credentials".to_string())),
    }
}

async fn list_statuses() -> Json<Vec<StatusInfo>> {
    Json(
        RepairStatus::ALL
            .iter()
            .map(|&status| StatusInfo {
                status,
                color: status.color().into(),
                description: status.description().into(),
                terminal: status.is_terminal(),
                allowed_transitions: status.allowed_transitions().to_vec(),
            })
            .collect(),
    )
}

async fn get_availability<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<AvailabilityEntry>>, SchedulingError> {
    let slots = state
        .scheduler
        .get_availability(query.date, &query.service_type)?;
    Ok(Json(slots.into_iter().map(Into::into).collect()))
}

async fn book_appointment<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Json(payload): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentView>), SchedulingError> {
    let payload = validated(payload)?;
    let order = BookingOrder {
        customer_ref: payload.customer_ref,
        template_id: payload.slot_id,
        date: payload.date,
        service_type: payload.service_type,
        problem_description: payload.problem_description,
        items: payload
            .items
            .into_iter()
            .map(|item| NewItem {
                kind: item.kind,
                description: item.description,
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
            })
            .collect(),
    };
    let appointment = state.scheduler.book(order)?;
    Ok((StatusCode::CREATED, Json(appointment.into())))
}

async fn get_appointment<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentView>, SchedulingError> {
    Ok(Json(state.scheduler.appointment(id)?.into()))
}

async fn transition_status<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<AppointmentView>, SchedulingError> {
    let appointment = state
        .scheduler
        .transition(id, payload.new_status, payload.note)?;
    Ok(Json(appointment.into()))
}

async fn get_history<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditLogEntry>>, SchedulingError> {
    Ok(Json(state.scheduler.history(id)?))
}

async fn list_templates<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Query(query): Query<TemplateListQuery>,
) -> Result<Json<Vec<SlotTemplate>>, SchedulingError> {
    Ok(Json(
        state.scheduler.list_templates(query.service_type.as_deref())?,
    ))
}

async fn upsert_template<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Json(payload): Json<UpsertTemplateRequest>,
) -> Result<Json<SlotTemplate>, SchedulingError> {
    let payload = validated(payload)?;
    let template = SlotTemplate {
        id: payload.id.unwrap_or_else(Uuid::new_v4),
        day_of_week: payload.day_of_week,
        start_time: payload.start_time,
        end_time: payload.end_time,
        max_appointments: payload.max_appointments,
        service_type: payload.service_type,
        enabled: payload.enabled,
    };
    Ok(Json(state.scheduler.upsert_template(template)?))
}

async fn set_template_enabled<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Json(payload): Json<SetTemplateEnabledRequest>,
) -> Result<StatusCode, SchedulingError> {
    state
        .scheduler
        .set_template_enabled(payload.id, payload.enabled)?;
    Ok(StatusCode::OK)
}

async fn remove_template<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Json(payload): Json<RemoveTemplateRequest>,
) -> Result<Json<TemplateRemoval>, SchedulingError> {
    Ok(Json(state.scheduler.remove_template(payload.id)?))
}

async fn list_exclusions<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Query(query): Query<ExclusionRangeQuery>,
) -> Result<Json<Vec<ExclusionDate>>, SchedulingError> {
    Ok(Json(state.scheduler.list_exclusions(query.from, query.to)?))
}

async fn add_exclusion<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Json(payload): Json<AddExclusionRequest>,
) -> Result<Json<ExclusionDate>, SchedulingError> {
    let payload = validated(payload)?;
    Ok(Json(
        state.scheduler.add_exclusion(payload.date, payload.reason)?,
    ))
}

async fn remove_exclusion<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Json(payload): Json<RemoveExclusionRequest>,
) -> Result<StatusCode, SchedulingError> {
    state.scheduler.remove_exclusion(payload.date)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_appointments<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<AppointmentView>>, SchedulingError> {
    let appointments = state.scheduler.list_appointments(query.date)?;
    Ok(Json(appointments.into_iter().map(Into::into).collect()))
}

async fn reschedule_appointment<T: SchedulingBackend>(
    State(state): State<AppState<T>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RescheduleRequest>,
) -> Result<Json<AppointmentView>, SchedulingError> {
    let appointment = state
        .scheduler
        .reschedule(id, payload.slot_id, payload.date)?;
    Ok(Json(appointment.into()))
}
