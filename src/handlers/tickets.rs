// src/handlers/tickets.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::Actor,
    models::{
        attendee::AttendeeData,
        query::TicketListParams,
        stock::ClaimOutcome,
        ticket::{GlobalStockMode, TicketProvider},
    },
    services::provider_service::{StockInput, TicketDraft},
};

// ---
// Validação customizada
// ---
fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payload: SaveTicket
// ---
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveTicketPayload {
    /// Presente = atualização.
    pub id: Option<Uuid>,

    pub provider: TicketProvider,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub price: Decimal,

    pub currency_code: Option<String>,

    #[serde(default)]
    pub menu_order: i32,

    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub mode: GlobalStockMode,

    // -1 = ilimitado
    #[validate(range(min = -1, message = "A capacidade deve ser -1 (ilimitado) ou maior."))]
    pub capacity: Option<i64>,

    #[validate(range(min = 0, message = "A capacidade do evento não pode ser negativa."))]
    pub event_capacity: Option<i64>,
}

impl SaveTicketPayload {
    fn validate_sale_window(&self) -> Result<(), ValidationError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ValidationError::new("EndBeforeStart"));
            }
        }
        Ok(())
    }

    fn into_parts(self) -> (TicketDraft, StockInput) {
        let draft = TicketDraft {
            id: self.id,
            provider: self.provider,
            name: self.name,
            description: self.description,
            price: self.price,
            currency_code: self.currency_code,
            menu_order: self.menu_order,
            start_date: self.start_date,
            end_date: self.end_date,
        };
        let stock = StockInput {
            mode: self.mode,
            capacity: self.capacity,
            event_capacity: self.event_capacity,
        };
        (draft, stock)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SalesPayload {
    /// Positivo vende, negativo devolve.
    pub delta: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAttendeesPayload {
    #[validate(range(min = 0, max = 500, message = "A quantidade deve estar entre 0 e 500."))]
    pub quantity: i64,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub full_name: String,

    #[validate(email(message = "E-mail inválido."))]
    pub email: String,

    pub user_id: Option<Uuid>,
    pub status: Option<String>,

    #[serde(default)]
    pub optout: bool,
}

// ---
// Helpers
// ---

/// Garante que o ingresso existe e que o ator pode gerenciar o evento dele.
async fn authorize_ticket(app_state: &AppState, ticket_id: Uuid, actor: Actor) -> Result<(), AppError> {
    let snapshot = app_state
        .tickets
        .get_snapshot(ticket_id)
        .await?
        .ok_or(AppError::TicketNotFound)?;

    if !app_state.provider.can_manage_event(actor.0, snapshot.event_id).await? {
        return Err(AppError::PermissionDenied);
    }
    Ok(())
}

// ---
// Handlers
// ---

pub async fn save_ticket(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<SaveTicketPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.validate_sale_window().map_err(|e| {
        let mut errors = validator::ValidationErrors::new();
        errors.add("endDate", e);
        AppError::ValidationError(errors)
    })?;

    let updating = payload.id.is_some();
    let (draft, stock) = payload.into_parts();

    let ticket_id = app_state
        .provider
        .save_ticket(event_id, draft, stock, actor.0)
        .await?
        .ok_or(AppError::PermissionDenied)?;

    let ticket = app_state
        .tickets
        .get_ticket(ticket_id)
        .await?
        .ok_or(AppError::TicketNotFound)?;

    let status = if updating { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(ticket)))
}

pub async fn list_tickets(
    State(app_state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Query(params): Query<TicketListParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.into_query(Some(vec![event_id]))?;
    let tickets = app_state.tickets.list(query).await?;
    Ok(Json(tickets))
}

pub async fn delete_ticket(
    State(app_state): State<AppState>,
    actor: Actor,
    Path((event_id, ticket_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.provider.delete_ticket(event_id, ticket_id, actor.0).await? {
        return Err(AppError::TicketNotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_ticket(
    State(app_state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = app_state
        .tickets
        .get_ticket(ticket_id)
        .await?
        .ok_or(AppError::TicketNotFound)?;
    Ok(Json(ticket))
}

pub async fn get_ticket_field(
    State(app_state): State<AppState>,
    Path((ticket_id, key)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    let value = app_state
        .tickets
        .get_field(ticket_id, &key)
        .await?
        .ok_or(AppError::TicketNotFound)?;
    Ok(Json(json!({ "key": key, "value": value })))
}

/// Corpo `{"chave": valor, ...}`: tudo num único save.
pub async fn update_ticket_fields(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(ticket_id): Path<Uuid>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, AppError> {
    authorize_ticket(&app_state, ticket_id, actor).await?;

    let mut editor = app_state.tickets.edit(ticket_id);
    for (key, value) in fields {
        editor = editor.set(&key, value)?;
    }

    let ticket = editor.commit().await?.ok_or(AppError::TicketNotFound)?;
    Ok(Json(ticket))
}

pub async fn duplicate_ticket(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    authorize_ticket(&app_state, ticket_id, actor).await?;

    let ticket = app_state
        .tickets
        .duplicate(ticket_id)
        .await?
        .ok_or(AppError::TicketNotFound)?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Ajuste manual (saturante) de vendas.
pub async fn adjust_sales(
    State(app_state): State<AppState>,
    actor: Actor,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<SalesPayload>,
) -> Result<impl IntoResponse, AppError> {
    authorize_ticket(&app_state, ticket_id, actor).await?;

    let adjustment = app_state
        .sales
        .adjust_sales(ticket_id, payload.delta)
        .await?
        .ok_or(AppError::TicketNotFound)?;
    Ok(Json(adjustment))
}

pub async fn generate_attendees(
    State(app_state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<GenerateAttendeesPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let data = AttendeeData {
        full_name: payload.full_name,
        email: payload.email,
        user_id: payload.user_id,
        status: payload.status,
        optout: payload.optout,
    };

    match app_state
        .provider
        .generate_attendees_for(ticket_id, payload.quantity, data)
        .await?
    {
        Some(ids) => Ok((StatusCode::CREATED, Json(json!({ "attendeeIds": ids })))),
        None => {
            // Distingue "não existe" de "sem estoque/fora da janela"
            let ticket = app_state
                .tickets
                .get_ticket(ticket_id)
                .await?
                .ok_or(AppError::TicketNotFound)?;
            Ok((
                StatusCode::CONFLICT,
                Json(json!({ "error": "Ingresso indisponível.", "available": ticket.available })),
            ))
        }
    }
}

/// Venda sem participante (ex.: pedido ainda sem titulares).
pub async fn claim_ticket(
    State(app_state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<SalesPayload>,
) -> Result<impl IntoResponse, AppError> {
    match app_state.sales.claim(ticket_id, payload.delta).await? {
        ClaimOutcome::Sold(adjustment) => Ok(Json(adjustment)),
        ClaimOutcome::Insufficient { available } => Err(AppError::InsufficientStock { available }),
        ClaimOutcome::NotFound => Err(AppError::TicketNotFound),
    }
}
