// src/db.rs
//
// Contratos de persistência. O motor só conversa com estes traits:
// em produção eles são implementados pelos repositórios Postgres,
// nos testes (e em uso embarcado) pelo `MemoryStore`.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        attendee::{
            ActivityLogEntry, AttendeeChanges, AttendeeRecord, AttendeeScope, CheckinDetails,
            NewAttendee, StatusCount,
        },
        event::{EventRecord, EventStockPool, EventTicketPresence},
        query::ResolvedTicketQuery,
        stock::{AdjustmentOutcome, AdjustmentRequest},
        ticket::{NewTicket, TicketChanges, TicketRecord},
    },
};

pub mod attendee_repo;
pub use attendee_repo::AttendeeRepository;
pub mod event_repo;
pub use event_repo::EventRepository;
pub mod memory;
pub use memory::MemoryStore;
pub mod ticket_repo;
pub use ticket_repo::TicketRepository;

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Ingressos removidos (soft delete) não são encontrados.
    async fn find_ticket(&self, id: Uuid) -> Result<Option<TicketRecord>, AppError>;

    async fn insert_ticket(&self, ticket: &NewTicket) -> Result<TicketRecord, AppError>;

    /// Grava as mudanças numa única escrita. `None` se o ingresso não existe.
    async fn update_ticket(
        &self,
        id: Uuid,
        changes: &TicketChanges,
    ) -> Result<Option<TicketRecord>, AppError>;

    async fn soft_delete_ticket(&self, id: Uuid) -> Result<bool, AppError>;

    async fn list_tickets(&self, query: &ResolvedTicketQuery)
        -> Result<Vec<TicketRecord>, AppError>;

    /// Ajuste atômico de vendas/estoque no ingresso e, se for o caso, no pool do evento.
    async fn adjust_sales(
        &self,
        id: Uuid,
        request: AdjustmentRequest,
    ) -> Result<AdjustmentOutcome, AppError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, title: &str, author_id: Option<Uuid>)
        -> Result<EventRecord, AppError>;

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRecord>, AppError>;

    async fn rename_event(&self, id: Uuid, title: &str) -> Result<Option<EventRecord>, AppError>;

    async fn find_pool(&self, event_id: Uuid) -> Result<Option<EventStockPool>, AppError>;

    async fn find_pools(&self, event_ids: &[Uuid]) -> Result<Vec<EventStockPool>, AppError>;

    /// Cria ou reconfigura o pool. Ligado, preserva as vendas acumuladas; novo ou
    /// religado, parte das vendas dos ingressos que o consomem.
    async fn configure_pool(
        &self,
        event_id: Uuid,
        enabled: bool,
        capacity: i64,
    ) -> Result<EventStockPool, AppError>;

    async fn ticket_presence(&self, event_ids: &[Uuid])
        -> Result<Vec<EventTicketPresence>, AppError>;
}

#[async_trait]
pub trait AttendeeStore: Send + Sync {
    /// Tudo ou nada: se uma inserção falhar, nenhuma fica gravada.
    async fn insert_attendees(
        &self,
        attendees: &[NewAttendee],
    ) -> Result<Vec<AttendeeRecord>, AppError>;

    async fn find_attendee(&self, id: Uuid) -> Result<Option<AttendeeRecord>, AppError>;

    async fn list_attendees(&self, scope: AttendeeScope) -> Result<Vec<AttendeeRecord>, AppError>;

    async fn update_attendee(
        &self,
        id: Uuid,
        changes: &AttendeeChanges,
    ) -> Result<Option<AttendeeRecord>, AppError>;

    /// Uma única escrita para todos os participantes do escopo. Devolve quantos mudaram.
    async fn bulk_update(
        &self,
        scope: AttendeeScope,
        changes: &AttendeeChanges,
    ) -> Result<u64, AppError>;

    async fn status_counts(&self, scope: AttendeeScope) -> Result<Vec<StatusCount>, AppError>;

    async fn mark_checked_in(
        &self,
        id: Uuid,
        details: &CheckinDetails,
        via_qr: bool,
    ) -> Result<Option<AttendeeRecord>, AppError>;

    /// Limpa flag, detalhes e QR juntos.
    async fn clear_checkin(&self, id: Uuid) -> Result<Option<AttendeeRecord>, AppError>;

    async fn increment_ticket_sent(&self, id: Uuid) -> Result<Option<i64>, AppError>;

    async fn append_activity(&self, id: Uuid, entry: &ActivityLogEntry) -> Result<bool, AppError>;

    async fn delete_attendee(&self, id: Uuid) -> Result<Option<AttendeeRecord>, AppError>;
}

/// Os três stores que os serviços recebem.
#[derive(Clone)]
pub struct Stores {
    pub tickets: Arc<dyn TicketStore>,
    pub attendees: Arc<dyn AttendeeStore>,
    pub events: Arc<dyn EventStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            tickets: Arc::new(TicketRepository::new(pool.clone())),
            attendees: Arc::new(AttendeeRepository::new(pool.clone())),
            events: Arc::new(EventRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_memory(MemoryStore::new())
    }

    pub fn from_memory(store: MemoryStore) -> Self {
        Self {
            tickets: Arc::new(store.clone()),
            attendees: Arc::new(store.clone()),
            events: Arc::new(store),
        }
    }
}
