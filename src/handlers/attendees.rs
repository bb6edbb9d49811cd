// src/handlers/attendees.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::Actor,
    models::{
        attendee::{ActivityLogEntry, Attendee},
        ticket::TicketProvider,
    },
    services::sales_engine::StatusReconciliation,
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    #[validate(length(min = 1, message = "O status é obrigatório."))]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinPayload {
    #[serde(default)]
    pub via_qr: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPayload {
    #[validate(length(min = 1, message = "O tipo é obrigatório."))]
    pub kind: String,

    #[validate(length(min = 1, message = "A mensagem é obrigatória."))]
    pub message: String,

    #[serde(default)]
    pub data: Value,
}

// ---
// Helpers
// ---

// Separa "não existe" (404) de "sem permissão" (403) depois de um `false`.
async fn denied_or_missing(app_state: &AppState, attendee_id: Uuid) -> AppError {
    match app_state.attendees.find(attendee_id).await {
        Ok(Some(_)) => AppError::PermissionDenied,
        Ok(None) => AppError::AttendeeNotFound,
        Err(e) => e,
    }
}

async fn find_attendee(app_state: &AppState, attendee_id: Uuid) -> Result<Attendee, AppError> {
    app_state
        .attendees
        .find(attendee_id)
        .await?
        .ok_or(AppError::AttendeeNotFound)
}

// ---
// Handlers
// ---

pub async fn get_attendee(
    State(app_state): State<AppState>,
    Path(attendee_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(find_attendee(&app_state, attendee_id).await?))
}

pub async fn get_attendee_field(
    State(app_state): State<AppState>,
    Path((attendee_id, key)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    let value = app_state
        .attendees
        .get_field(attendee_id, &key)
        .await?
        .ok_or(AppError::AttendeeNotFound)?;
    Ok(Json(json!({ "key": key, "value": value })))
}

pub async fn change_status(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(attendee_id): Path<Uuid>,
    Json(payload): Json<StatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let Some(reconciliation) = app_state
        .provider
        .change_attendee_status(attendee_id, &payload.status, actor.0)
        .await?
    else {
        return Err(denied_or_missing(&app_state, attendee_id).await);
    };

    match reconciliation {
        StatusReconciliation::Rejected { available } => Err(AppError::InsufficientStock { available }),
        StatusReconciliation::NotFound => Err(AppError::TicketNotFound),
        outcome => Ok(Json(outcome)),
    }
}

pub async fn delete_attendee(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(attendee_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.provider.delete_attendee(attendee_id, actor.0).await? {
        return Err(denied_or_missing(&app_state, attendee_id).await);
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn checkin(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(attendee_id): Path<Uuid>,
    payload: Option<Json<CheckinPayload>>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.unwrap_or_default();

    if !app_state.checkin.checkin(attendee_id, payload.via_qr, actor.0).await? {
        return Err(denied_or_missing(&app_state, attendee_id).await);
    }
    Ok(Json(find_attendee(&app_state, attendee_id).await?))
}

pub async fn uncheckin(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(attendee_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.checkin.uncheckin(attendee_id, actor.0).await? {
        return Err(denied_or_missing(&app_state, attendee_id).await);
    }
    Ok(Json(find_attendee(&app_state, attendee_id).await?))
}

pub async fn mark_ticket_sent(
    State(app_state): State<AppState>,
    Path(attendee_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let sent = app_state
        .checkin
        .update_ticket_sent_counter(attendee_id)
        .await?
        .ok_or(AppError::AttendeeNotFound)?;
    Ok(Json(json!({ "ticketSent": sent })))
}

pub async fn append_activity(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(attendee_id): Path<Uuid>,
    Json(payload): Json<ActivityPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut entry = ActivityLogEntry::new(payload.kind, payload.message, actor.0);
    entry.data = payload.data;

    if !app_state
        .checkin
        .update_attendee_activity_log(attendee_id, entry)
        .await?
    {
        return Err(AppError::AttendeeNotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Opções de status (e o peso de cada uma) do canal.
pub async fn status_options(
    State(app_state): State<AppState>,
    Path(provider): Path<TicketProvider>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.sales.status_options().options(provider).to_vec()))
}
