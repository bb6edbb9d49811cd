//! Montagem compartilhada dos testes de integração: stores em memória,
//! permissões liberadas e atalhos para criar eventos e ingressos.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use event_tickets::{
    common::{error::AppError, hooks::Hooks},
    config::{AppState, Settings},
    db::{AttendeeStore, MemoryStore, Stores},
    models::{
        attendee::{
            ActivityLogEntry, AttendeeChanges, AttendeeData, AttendeeRecord, AttendeeScope,
            CheckinDetails, NewAttendee, StatusCount,
        },
        ticket::{GlobalStockMode, TicketProvider},
    },
    services::{
        provider_service::{StockInput, TicketDraft},
        CapabilityChecker, StaticCapabilities,
    },
};

pub fn app() -> AppState {
    app_with(Hooks::new())
}

pub fn app_with(hooks: Hooks) -> AppState {
    build(Stores::in_memory(), hooks, Arc::new(StaticCapabilities::allow_all()))
}

pub fn build(stores: Stores, hooks: Hooks, capabilities: Arc<dyn CapabilityChecker>) -> AppState {
    AppState::with_capabilities(&Settings::default(), stores, hooks, capabilities)
}

pub async fn event(app: &AppState) -> Uuid {
    app.provider
        .create_event("Festival de Inverno", None)
        .await
        .unwrap()
        .id
}

pub fn draft(name: &str, provider: TicketProvider) -> TicketDraft {
    TicketDraft {
        id: None,
        provider,
        name: name.to_string(),
        description: None,
        price: "25.00".parse().unwrap(),
        currency_code: None,
        menu_order: 0,
        start_date: None,
        end_date: None,
    }
}

pub fn own(capacity: i64) -> StockInput {
    StockInput {
        mode: GlobalStockMode::Own,
        capacity: Some(capacity),
        event_capacity: None,
    }
}

pub fn global(event_capacity: i64) -> StockInput {
    StockInput {
        mode: GlobalStockMode::Global,
        capacity: None,
        event_capacity: Some(event_capacity),
    }
}

pub fn capped(cap: i64, event_capacity: i64) -> StockInput {
    StockInput {
        mode: GlobalStockMode::Capped,
        capacity: Some(cap),
        event_capacity: Some(event_capacity),
    }
}

pub async fn ticket(app: &AppState, event_id: Uuid, name: &str, stock: StockInput) -> Uuid {
    ticket_for(app, event_id, draft(name, TicketProvider::Commerce), stock).await
}

pub async fn ticket_for(app: &AppState, event_id: Uuid, draft: TicketDraft, stock: StockInput) -> Uuid {
    app.provider
        .save_ticket(event_id, draft, stock, None)
        .await
        .unwrap()
        .expect("permissões liberadas nos testes")
}

pub fn holder(name: &str) -> AttendeeData {
    AttendeeData {
        full_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        ..Default::default()
    }
}

// ---
// Store de participantes que recusa qualquer inserção
// ---

#[derive(Clone, Default)]
pub struct FailingAttendees {
    inner: MemoryStore,
}

impl FailingAttendees {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AttendeeStore for FailingAttendees {
    async fn insert_attendees(&self, _: &[NewAttendee]) -> Result<Vec<AttendeeRecord>, AppError> {
        Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut))
    }

    async fn find_attendee(&self, id: Uuid) -> Result<Option<AttendeeRecord>, AppError> {
        self.inner.find_attendee(id).await
    }

    async fn list_attendees(&self, scope: AttendeeScope) -> Result<Vec<AttendeeRecord>, AppError> {
        self.inner.list_attendees(scope).await
    }

    async fn update_attendee(
        &self,
        id: Uuid,
        changes: &AttendeeChanges,
    ) -> Result<Option<AttendeeRecord>, AppError> {
        self.inner.update_attendee(id, changes).await
    }

    async fn bulk_update(&self, scope: AttendeeScope, changes: &AttendeeChanges) -> Result<u64, AppError> {
        self.inner.bulk_update(scope, changes).await
    }

    async fn status_counts(&self, scope: AttendeeScope) -> Result<Vec<StatusCount>, AppError> {
        self.inner.status_counts(scope).await
    }

    async fn mark_checked_in(
        &self,
        id: Uuid,
        details: &CheckinDetails,
        via_qr: bool,
    ) -> Result<Option<AttendeeRecord>, AppError> {
        self.inner.mark_checked_in(id, details, via_qr).await
    }

    async fn clear_checkin(&self, id: Uuid) -> Result<Option<AttendeeRecord>, AppError> {
        self.inner.clear_checkin(id).await
    }

    async fn increment_ticket_sent(&self, id: Uuid) -> Result<Option<i64>, AppError> {
        self.inner.increment_ticket_sent(id).await
    }

    async fn append_activity(&self, id: Uuid, entry: &ActivityLogEntry) -> Result<bool, AppError> {
        self.inner.append_activity(id, entry).await
    }

    async fn delete_attendee(&self, id: Uuid) -> Result<Option<AttendeeRecord>, AppError> {
        self.inner.delete_attendee(id).await
    }
}
