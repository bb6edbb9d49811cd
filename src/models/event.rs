// src/models/event.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::stock::StockCounters;

// ---
// 1. Event (o conteúdo que recebe os ingressos)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: Uuid,
    pub title: String,
    // Dono do evento: quem pode gerenciar ingressos e participantes
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. EventStockPool (o "estoque global" do evento)
// ---
// Entidade própria, endereçada pelo ID do evento. Ingressos em modo
// global/capped apontam para ela pelo event_id, nunca por referência.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventStockPool {
    pub event_id: Uuid,
    pub enabled: bool,
    pub capacity: i64,
    pub sales: i64,
    pub stock: i64,
    pub updated_at: DateTime<Utc>,
}

impl EventStockPool {
    pub const CAPACITY_KEY: &'static str = "_tribe_ticket_capacity";

    pub fn counters(&self) -> StockCounters {
        StockCounters {
            sales: self.sales,
            stock: self.stock,
            capacity: Some(self.capacity),
            managed: true,
        }
    }
}

/// Presença de ingressos/RSVPs/participantes por evento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventTicketPresence {
    pub event_id: Uuid,
    pub tickets: i64,
    pub rsvps: i64,
    pub attendees: i64,
}

/// Filtros "tem ingressos / tem RSVP / tem participantes" (None = ignora).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFlags {
    pub has_tickets: Option<bool>,
    pub has_rsvp: Option<bool>,
    pub has_attendees: Option<bool>,
}
