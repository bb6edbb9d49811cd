// src/models/attendee.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::models::ticket::TicketProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckinSource {
    Site,
    App,
}

/// Detalhes gravados junto com o check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinDetails {
    pub date: DateTime<Utc>,
    pub source: CheckinSource,
    pub author: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub actor: Option<Uuid>,
    #[serde(default)]
    pub data: Value,
}

impl ActivityLogEntry {
    pub fn new(kind: impl Into<String>, message: impl Into<String>, actor: Option<Uuid>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: kind.into(),
            message: message.into(),
            actor,
            data: Value::Null,
        }
    }
}

// ---
// AttendeeRecord: a linha da tabela `attendees`
// ---
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AttendeeRecord {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub event_id: Uuid,
    pub provider: String,
    pub full_name: String,
    pub email: String,
    pub security_code: String,
    pub status: String,
    pub user_id: Option<Uuid>,
    pub optout: bool,
    pub checked_in: bool,
    pub checkin_details: Option<Json<CheckinDetails>>,
    pub qr_status: Option<bool>,
    pub ticket_sent: Option<i64>,
    pub activity_log: Json<Vec<ActivityLogEntry>>,
    pub deleted_product_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// Attendee: objeto de valor exposto
// ---
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub event_id: Uuid,
    pub provider: TicketProvider,
    pub full_name: String,
    pub email: String,
    pub security_code: String,
    pub status: String,
    pub user_id: Option<Uuid>,
    pub optout: bool,
    pub checked_in: bool,
    pub checkin_details: Option<CheckinDetails>,
    pub qr_status: Option<bool>,
    pub ticket_sent: i64,
    pub activity_log: Vec<ActivityLogEntry>,
    pub deleted_product_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AttendeeRecord> for Attendee {
    type Error = crate::common::error::AppError;

    fn try_from(record: AttendeeRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            ticket_id: record.ticket_id,
            event_id: record.event_id,
            provider: record.provider.parse()?,
            full_name: record.full_name,
            email: record.email,
            security_code: record.security_code,
            status: record.status,
            user_id: record.user_id,
            optout: record.optout,
            checked_in: record.checked_in,
            checkin_details: record.checkin_details.map(|details| details.0),
            qr_status: record.qr_status,
            // vazio/ausente conta como zero envios
            ticket_sent: record.ticket_sent.unwrap_or(0),
            activity_log: record.activity_log.0,
            deleted_product_name: record.deleted_product_name,
            created_at: record.created_at,
        })
    }
}

/// Participante a inserir.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendee {
    pub ticket_id: Uuid,
    pub event_id: Uuid,
    pub provider: TicketProvider,
    pub full_name: String,
    pub email: String,
    pub security_code: String,
    pub status: String,
    pub user_id: Option<Uuid>,
    pub optout: bool,
}

/// Dados do titular informados na compra/RSVP.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeData {
    pub full_name: String,
    pub email: String,
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    #[serde(default)]
    pub optout: bool,
}

/// Mesmos valores aplicados a vários participantes numa única escrita.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendeeChanges {
    pub status: Option<String>,
    pub optout: Option<bool>,
    pub deleted_product_name: Option<String>,
}

impl AttendeeChanges {
    pub fn is_empty(&self) -> bool {
        *self == AttendeeChanges::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendeeScope {
    Ticket(Uuid),
    Event(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct StatusCount {
    pub status: String,
    pub total: i64,
}
