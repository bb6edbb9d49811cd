// src/common/hooks.rs
//
// Pontos de extensão. Dois tipos distintos:
// - Filter<T>: cadeia ordenada de funções puras que recebem e devolvem o valor;
// - Action<T>: lista ordenada de callbacks que só observam um snapshot imutável.
// Prioridade menor roda primeiro; empate mantém a ordem de registro.

use std::{fmt, sync::Arc};

use serde_json::Value;
use uuid::Uuid;

use crate::models::{
    attendee::{ActivityLogEntry, Attendee},
    ticket::{Ticket, TicketProvider},
};

pub const DEFAULT_PRIORITY: i32 = 10;

type FilterFn<T> = Arc<dyn Fn(T) -> T + Send + Sync>;
type ActionFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct Filter<T> {
    callbacks: Vec<(i32, FilterFn<T>)>,
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Self { callbacks: Vec::new() }
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("callbacks", &self.callbacks.len()).finish()
    }
}

impl<T> Filter<T> {
    pub fn add<F>(&mut self, priority: i32, callback: F)
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.callbacks.push((priority, Arc::new(callback)));
        // sort_by_key é estável: mesma prioridade mantém a ordem de registro
        self.callbacks.sort_by_key(|(priority, _)| *priority);
    }

    pub fn apply(&self, value: T) -> T {
        self.callbacks
            .iter()
            .fold(value, |current, (_, callback)| callback(current))
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

pub struct Action<T> {
    callbacks: Vec<(i32, ActionFn<T>)>,
}

impl<T> Default for Action<T> {
    fn default() -> Self {
        Self { callbacks: Vec::new() }
    }
}

impl<T> fmt::Debug for Action<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("callbacks", &self.callbacks.len()).finish()
    }
}

impl<T> Action<T> {
    pub fn add<F>(&mut self, priority: i32, callback: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.callbacks.push((priority, Arc::new(callback)));
        self.callbacks.sort_by_key(|(priority, _)| *priority);
    }

    pub fn notify(&self, payload: &T) {
        for (_, callback) in &self.callbacks {
            callback(payload);
        }
    }
}

// ---
// Payloads
// ---

/// Notificações emitidas pelo núcleo. Ouvintes leem, não bloqueiam a operação.
#[derive(Debug, Clone, PartialEq)]
pub enum TicketNotice {
    BeforeTicketCreate { event_id: Uuid, name: String, provider: TicketProvider },
    TicketCreated { event_id: Uuid, ticket: Ticket },
    AfterTicketSave { event_id: Uuid, ticket: Ticket },
    TicketDeleted { event_id: Uuid, ticket: Ticket },
    AttendeeCreated { attendee: Attendee, ticket: Ticket },
    CheckedIn { attendee: Attendee, via_qr: bool },
    CheckinReverted { attendee: Attendee },
}

impl TicketNotice {
    pub fn name(&self) -> &'static str {
        match self {
            TicketNotice::BeforeTicketCreate { .. } => "before_ticket_create",
            TicketNotice::TicketCreated { .. } => "ticket_created",
            TicketNotice::AfterTicketSave { .. } => "after_ticket_save",
            TicketNotice::TicketDeleted { .. } => "ticket_deleted",
            TicketNotice::AttendeeCreated { .. } => "attendee_created",
            TicketNotice::CheckedIn { .. } => "checkin",
            TicketNotice::CheckinReverted { .. } => "uncheckin",
        }
    }
}

/// Entrada crua de opções de status: o peso ainda não foi validado.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStatusOption {
    pub status: String,
    pub decrease_stock_by: Value,
}

impl RawStatusOption {
    pub fn new(status: impl Into<String>, decrease_stock_by: impl Into<Value>) -> Self {
        Self {
            status: status.into(),
            decrease_stock_by: decrease_stock_by.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusOptionsInput {
    pub provider: TicketProvider,
    pub options: Vec<RawStatusOption>,
}

// ---
// Registro de hooks
// ---

#[derive(Debug, Default)]
pub struct Hooks {
    /// "Ingressos do evento X" -> ingressos dos eventos devolvidos (um, vários ou nenhum).
    pub ticket_event_ids: Filter<Vec<Uuid>>,
    /// Eventos que contam como "tendo participantes" vindos de outro lugar.
    pub events_with_injected_attendees: Filter<Vec<Uuid>>,
    /// Entrada candidata do log de atividade, antes de ser anexada.
    pub attendee_activity_entry: Filter<ActivityLogEntry>,
    /// Tabela declarativa de pesos por status, antes da poda.
    pub stock_status_options: Filter<StatusOptionsInput>,
    pub notices: Action<TicketNotice>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self, notice: TicketNotice) {
        tracing::debug!(notice = notice.name(), "notificando ouvintes");
        self.notices.notify(&notice);
    }
}
