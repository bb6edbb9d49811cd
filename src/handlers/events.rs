// src/handlers/events.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::Actor,
    models::{attendee::AttendeeScope, event::EventFlags},
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[validate(length(min = 1, message = "O título é obrigatório."))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SharedStockPayload {
    pub enabled: bool,

    #[validate(range(min = 0, message = "A capacidade do evento não pode ser negativa."))]
    pub capacity: i64,
}

/// `?ids=a,b,c&hasTickets=true`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilterParams {
    #[serde(default)]
    pub ids: String,
    pub has_tickets: Option<bool>,
    pub has_rsvp: Option<bool>,
    pub has_attendees: Option<bool>,
}

impl EventFilterParams {
    fn flags(&self) -> EventFlags {
        EventFlags {
            has_tickets: self.has_tickets,
            has_rsvp: self.has_rsvp,
            has_attendees: self.has_attendees,
        }
    }
}

fn parse_ids(raw: &str) -> Result<Vec<Uuid>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            Uuid::parse_str(id).map_err(|_| AppError::InvalidFieldValue {
                field: "ids".into(),
                reason: format!("'{id}' não é um UUID"),
            })
        })
        .collect()
}

// ---
// Handlers
// ---

pub async fn create_event(
    State(app_state): State<AppState>,
    actor: Actor,
    Json(payload): Json<EventPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let event = app_state.provider.create_event(&payload.title, actor.0).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn rename_event(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<EventPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let event = app_state
        .provider
        .rename_event(event_id, &payload.title, actor.0)
        .await?
        .ok_or(AppError::PermissionDenied)?;
    Ok(Json(event))
}

pub async fn configure_shared_stock(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<SharedStockPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let pool = app_state
        .provider
        .configure_shared_stock(event_id, payload.enabled, payload.capacity, actor.0)
        .await?
        .ok_or(AppError::PermissionDenied)?;
    Ok(Json(pool))
}

pub async fn ticket_counts(
    State(app_state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let counts = app_state.tickets.ticket_counts(event_id).await?;
    Ok(Json(counts))
}

pub async fn attendee_status_counts(
    State(app_state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let counts = app_state
        .attendees
        .status_counts(AttendeeScope::Event(event_id))
        .await?;
    Ok(Json(counts))
}

pub async fn list_attendees(
    State(app_state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attendees = app_state.attendees.list(AttendeeScope::Event(event_id)).await?;
    Ok(Json(attendees))
}

pub async fn filter_events(
    State(app_state): State<AppState>,
    Query(params): Query<EventFilterParams>,
) -> Result<impl IntoResponse, AppError> {
    let candidates = parse_ids(&params.ids)?;
    let events = app_state.tickets.events_with(&candidates, params.flags()).await?;
    Ok(Json(events))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_comma_separated_and_blank_tolerant() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(parse_ids(&format!("{a}, {b},")).unwrap(), vec![a, b]);
        assert!(parse_ids("").unwrap().is_empty());
        assert!(matches!(
            parse_ids("abc"),
            Err(AppError::InvalidFieldValue { .. })
        ));
    }
}
