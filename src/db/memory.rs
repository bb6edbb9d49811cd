// src/db/memory.rs
//
// Store em memória com as mesmas semânticas dos repositórios Postgres.
// Um único Mutex serializa as operações (faz o papel da trava de linha),
// e o clamp é o mesmo `StockCounters::apply` que o SQL reproduz.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AttendeeStore, EventStore, TicketStore},
    models::{
        attendee::{
            ActivityLogEntry, AttendeeChanges, AttendeeRecord, AttendeeScope, CheckinDetails,
            NewAttendee, StatusCount,
        },
        event::{EventRecord, EventStockPool, EventTicketPresence},
        query::ResolvedTicketQuery,
        stock::{AdjustmentOutcome, AdjustmentRequest, PoolCounters, SalesAdjustment},
        ticket::{
            pool_transfer, GlobalStockMode, NewTicket, TicketChanges, TicketProvider, TicketRecord,
        },
    },
};

#[derive(Debug, Default)]
struct MemoryState {
    events: HashMap<Uuid, EventRecord>,
    pools: HashMap<Uuid, EventStockPool>,
    tickets: HashMap<Uuid, TicketRecord>,
    // Vec para manter a ordem de inserção
    attendees: Vec<AttendeeRecord>,
}

impl MemoryState {
    fn live_ticket(&self, id: Uuid) -> Option<&TicketRecord> {
        self.tickets.get(&id).filter(|t| t.deleted_at.is_none())
    }

    /// Vendas dos ingressos que consomem o pool do evento.
    fn shared_sales(&self, event_id: Uuid) -> i64 {
        self.tickets
            .values()
            .filter(|t| t.deleted_at.is_none() && t.event_id == event_id && t.shares_pool())
            .map(|t| t.total_sales)
            .sum()
    }

    fn attendee_mut(&mut self, id: Uuid) -> Option<&mut AttendeeRecord> {
        self.attendees.iter_mut().find(|a| a.id == id)
    }

    fn in_scope(attendee: &AttendeeRecord, scope: AttendeeScope) -> bool {
        match scope {
            AttendeeScope::Ticket(id) => attendee.ticket_id == id,
            AttendeeScope::Event(id) => attendee.event_id == id,
        }
    }
}

fn apply_attendee_changes(record: &mut AttendeeRecord, changes: &AttendeeChanges) {
    if let Some(status) = &changes.status {
        record.status = status.clone();
    }
    if let Some(optout) = changes.optout {
        record.optout = optout;
    }
    if let Some(name) = &changes.deleted_product_name {
        record.deleted_product_name = Some(name.clone());
    }
    record.updated_at = Utc::now();
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---
// Ingressos
// ---

#[async_trait]
impl TicketStore for MemoryStore {
    async fn find_ticket(&self, id: Uuid) -> Result<Option<TicketRecord>, AppError> {
        let state = self.state.lock().await;
        Ok(state.live_ticket(id).cloned())
    }

    async fn insert_ticket(&self, ticket: &NewTicket) -> Result<TicketRecord, AppError> {
        let now = Utc::now();
        let record = TicketRecord {
            id: Uuid::new_v4(),
            event_id: ticket.event_id,
            provider: ticket.provider.as_str().to_string(),
            name: ticket.name.clone(),
            description: ticket.description.clone(),
            price: ticket.price,
            currency_code: ticket.currency_code.clone(),
            currency_symbol: ticket.currency_symbol.clone(),
            menu_order: ticket.menu_order,
            start_date: ticket.start_date,
            end_date: ticket.end_date,
            capacity: ticket.capacity,
            total_sales: 0,
            stock: ticket.initial_stock(),
            manage_stock: ticket.manage_stock,
            global_stock_mode: ticket.global_stock_mode.as_str().to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let mut state = self.state.lock().await;
        state.tickets.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_ticket(
        &self,
        id: Uuid,
        changes: &TicketChanges,
    ) -> Result<Option<TicketRecord>, AppError> {
        let mut state = self.state.lock().await;
        let Some(record) = state.tickets.get_mut(&id).filter(|t| t.deleted_at.is_none()) else {
            return Ok(None);
        };
        let shared_before = record.shares_pool();
        changes.apply_to(record);
        let saved = record.clone();

        // Entrou ou saiu do pool: as vendas acompanham, pelo mesmo clamp
        let transfer = pool_transfer(shared_before, &saved);
        if transfer != 0 {
            if let Some(pool) = state.pools.get_mut(&saved.event_id).filter(|p| p.enabled) {
                let moved = pool.counters().apply(transfer);
                pool.sales = moved.counters.sales;
                pool.stock = moved.counters.stock;
                pool.updated_at = Utc::now();
            }
        }
        Ok(Some(saved))
    }

    async fn soft_delete_ticket(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        match state.tickets.get_mut(&id).filter(|t| t.deleted_at.is_none()) {
            Some(record) => {
                let now = Utc::now();
                record.deleted_at = Some(now);
                record.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_tickets(
        &self,
        query: &ResolvedTicketQuery,
    ) -> Result<Vec<TicketRecord>, AppError> {
        let state = self.state.lock().await;

        let mut tickets: Vec<TicketRecord> = state
            .tickets
            .values()
            .filter(|t| t.deleted_at.is_none())
            .filter(|t| {
                query
                    .event_ids
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&t.event_id))
            })
            .filter(|t| query.provider.is_none_or(|p| t.provider == p.as_str()))
            .filter(|t| {
                query
                    .cost
                    .is_none_or(|filter| filter.matches(t.effective_cost()))
            })
            .filter(|t| {
                query
                    .currency
                    .as_ref()
                    .is_none_or(|c| c.matches(&t.currency_code, &t.currency_symbol))
            })
            .filter(|t| {
                query.attendee_id.is_none_or(|attendee_id| {
                    state
                        .attendees
                        .iter()
                        .any(|a| a.id == attendee_id && a.ticket_id == t.id)
                })
            })
            .filter(|t| {
                query.attendee_user_id.is_none_or(|user_id| {
                    state
                        .attendees
                        .iter()
                        .any(|a| a.user_id == Some(user_id) && a.ticket_id == t.id)
                })
            })
            .cloned()
            .collect();

        tickets.sort_by_key(|t| (t.menu_order, t.created_at));
        Ok(tickets)
    }

    async fn adjust_sales(
        &self,
        id: Uuid,
        request: AdjustmentRequest,
    ) -> Result<AdjustmentOutcome, AppError> {
        let mut state = self.state.lock().await;

        let Some(ticket) = state.live_ticket(id) else {
            return Ok(AdjustmentOutcome::NotFound);
        };
        let counters = ticket.counters();
        let mode = ticket.mode();
        let shares_pool = ticket.shares_pool();
        let event_id = ticket.event_id;

        let pool = state
            .pools
            .get(&event_id)
            .filter(|p| shares_pool && p.enabled)
            .map(|p| p.counters());

        // 1. Guarda de admissão (ingresso para own/capped, pool para global/capped)
        if request.guarded {
            let pool_governs = mode == GlobalStockMode::Global && pool.is_some();
            if !pool_governs && !counters.admits(request.delta) {
                return Ok(AdjustmentOutcome::Rejected { available: counters.stock });
            }
            if let Some(pool) = pool {
                if !pool.admits(request.delta) {
                    return Ok(AdjustmentOutcome::Rejected { available: pool.stock });
                }
            }
        }

        // 2. Ingresso
        let ticket_delta = counters.apply(request.delta);
        if let Some(record) = state.tickets.get_mut(&id) {
            record.total_sales = ticket_delta.counters.sales;
            record.stock = ticket_delta.counters.stock;
            record.updated_at = Utc::now();
        }

        let mut adjustment = SalesAdjustment {
            ticket_id: id,
            sales: ticket_delta.counters.sales,
            stock: ticket_delta.counters.stock,
            applied: ticket_delta.applied,
            saturated: ticket_delta.saturated,
            pool: None,
        };

        // 3. Pool, com o delta efetivamente aplicado
        if let (Some(pool), Some(record)) = (pool, state.pools.get_mut(&event_id)) {
            let pool_delta = pool.apply(ticket_delta.applied);
            record.sales = pool_delta.counters.sales;
            record.stock = pool_delta.counters.stock;
            record.updated_at = Utc::now();
            adjustment.saturated |= pool_delta.saturated;
            adjustment.pool = Some(PoolCounters {
                event_id,
                sales: record.sales,
                stock: record.stock,
            });
        }

        Ok(AdjustmentOutcome::Applied(adjustment))
    }
}

// ---
// Eventos e pool
// ---

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(
        &self,
        title: &str,
        author_id: Option<Uuid>,
    ) -> Result<EventRecord, AppError> {
        let now = Utc::now();
        let event = EventRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            author_id,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.lock().await;
        state.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRecord>, AppError> {
        let state = self.state.lock().await;
        Ok(state.events.get(&id).cloned())
    }

    async fn rename_event(&self, id: Uuid, title: &str) -> Result<Option<EventRecord>, AppError> {
        let mut state = self.state.lock().await;
        Ok(state.events.get_mut(&id).map(|event| {
            event.title = title.to_string();
            event.updated_at = Utc::now();
            event.clone()
        }))
    }

    async fn find_pool(&self, event_id: Uuid) -> Result<Option<EventStockPool>, AppError> {
        let state = self.state.lock().await;
        Ok(state.pools.get(&event_id).cloned())
    }

    async fn find_pools(&self, event_ids: &[Uuid]) -> Result<Vec<EventStockPool>, AppError> {
        let state = self.state.lock().await;
        Ok(event_ids
            .iter()
            .filter_map(|id| state.pools.get(id).cloned())
            .collect())
    }

    async fn configure_pool(
        &self,
        event_id: Uuid,
        enabled: bool,
        capacity: i64,
    ) -> Result<EventStockPool, AppError> {
        let mut state = self.state.lock().await;
        // Pool novo ou religado: as vendas feitas fora dele passam a contar
        let shared_sales = state.shared_sales(event_id);
        let pool = state.pools.entry(event_id).or_insert_with(|| EventStockPool {
            event_id,
            enabled: false,
            capacity,
            sales: 0,
            stock: 0,
            updated_at: Utc::now(),
        });
        if !pool.enabled {
            pool.sales = shared_sales;
        }
        pool.enabled = enabled;
        pool.capacity = capacity;
        pool.stock = (capacity - pool.sales).max(0);
        pool.updated_at = Utc::now();
        Ok(pool.clone())
    }

    async fn ticket_presence(
        &self,
        event_ids: &[Uuid],
    ) -> Result<Vec<EventTicketPresence>, AppError> {
        let state = self.state.lock().await;
        let count_tickets = |event_id: Uuid, provider: TicketProvider| {
            state
                .tickets
                .values()
                .filter(|t| t.deleted_at.is_none())
                .filter(|t| t.event_id == event_id && t.provider == provider.as_str())
                .count() as i64
        };

        Ok(event_ids
            .iter()
            .filter(|id| state.events.contains_key(id))
            .map(|&event_id| EventTicketPresence {
                event_id,
                tickets: count_tickets(event_id, TicketProvider::Commerce),
                rsvps: count_tickets(event_id, TicketProvider::Rsvp),
                attendees: state
                    .attendees
                    .iter()
                    .filter(|a| a.event_id == event_id)
                    .count() as i64,
            })
            .collect())
    }
}

// ---
// Participantes
// ---

#[async_trait]
impl AttendeeStore for MemoryStore {
    async fn insert_attendees(
        &self,
        attendees: &[NewAttendee],
    ) -> Result<Vec<AttendeeRecord>, AppError> {
        let mut state = self.state.lock().await;

        // Valida o lote inteiro antes de gravar qualquer linha
        for (index, attendee) in attendees.iter().enumerate() {
            let taken = state
                .attendees
                .iter()
                .any(|a| a.security_code == attendee.security_code)
                || attendees[..index]
                    .iter()
                    .any(|a| a.security_code == attendee.security_code);
            if taken {
                return Err(AppError::DuplicateSecurityCode);
            }
        }

        let now = Utc::now();
        let created: Vec<AttendeeRecord> = attendees
            .iter()
            .map(|attendee| AttendeeRecord {
                id: Uuid::new_v4(),
                ticket_id: attendee.ticket_id,
                event_id: attendee.event_id,
                provider: attendee.provider.as_str().to_string(),
                full_name: attendee.full_name.clone(),
                email: attendee.email.clone(),
                security_code: attendee.security_code.clone(),
                status: attendee.status.clone(),
                user_id: attendee.user_id,
                optout: attendee.optout,
                checked_in: false,
                checkin_details: None,
                qr_status: None,
                ticket_sent: None,
                activity_log: Json(Vec::new()),
                deleted_product_name: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        state.attendees.extend(created.iter().cloned());
        Ok(created)
    }

    async fn find_attendee(&self, id: Uuid) -> Result<Option<AttendeeRecord>, AppError> {
        let state = self.state.lock().await;
        Ok(state.attendees.iter().find(|a| a.id == id).cloned())
    }

    async fn list_attendees(&self, scope: AttendeeScope) -> Result<Vec<AttendeeRecord>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .attendees
            .iter()
            .filter(|a| MemoryState::in_scope(a, scope))
            .cloned()
            .collect())
    }

    async fn update_attendee(
        &self,
        id: Uuid,
        changes: &AttendeeChanges,
    ) -> Result<Option<AttendeeRecord>, AppError> {
        let mut state = self.state.lock().await;
        Ok(state.attendee_mut(id).map(|record| {
            apply_attendee_changes(record, changes);
            record.clone()
        }))
    }

    async fn bulk_update(
        &self,
        scope: AttendeeScope,
        changes: &AttendeeChanges,
    ) -> Result<u64, AppError> {
        if changes.is_empty() {
            return Ok(0);
        }
        let mut state = self.state.lock().await;
        let mut affected = 0;
        for record in state
            .attendees
            .iter_mut()
            .filter(|a| MemoryState::in_scope(a, scope))
        {
            apply_attendee_changes(record, changes);
            affected += 1;
        }
        Ok(affected)
    }

    async fn status_counts(&self, scope: AttendeeScope) -> Result<Vec<StatusCount>, AppError> {
        let state = self.state.lock().await;
        let mut totals: HashMap<&str, i64> = HashMap::new();
        for attendee in state.attendees.iter().filter(|a| MemoryState::in_scope(a, scope)) {
            *totals.entry(attendee.status.as_str()).or_default() += 1;
        }

        let mut counts: Vec<StatusCount> = totals
            .into_iter()
            .map(|(status, total)| StatusCount { status: status.to_string(), total })
            .collect();
        counts.sort_by(|a, b| a.status.cmp(&b.status));
        Ok(counts)
    }

    async fn mark_checked_in(
        &self,
        id: Uuid,
        details: &CheckinDetails,
        via_qr: bool,
    ) -> Result<Option<AttendeeRecord>, AppError> {
        let mut state = self.state.lock().await;
        Ok(state.attendee_mut(id).map(|record| {
            record.checked_in = true;
            record.checkin_details = Some(Json(details.clone()));
            record.qr_status = via_qr.then_some(true);
            record.updated_at = Utc::now();
            record.clone()
        }))
    }

    async fn clear_checkin(&self, id: Uuid) -> Result<Option<AttendeeRecord>, AppError> {
        let mut state = self.state.lock().await;
        Ok(state.attendee_mut(id).map(|record| {
            record.checked_in = false;
            record.checkin_details = None;
            record.qr_status = None;
            record.updated_at = Utc::now();
            record.clone()
        }))
    }

    async fn increment_ticket_sent(&self, id: Uuid) -> Result<Option<i64>, AppError> {
        let mut state = self.state.lock().await;
        Ok(state.attendee_mut(id).map(|record| {
            let sent = record.ticket_sent.unwrap_or(0) + 1;
            record.ticket_sent = Some(sent);
            sent
        }))
    }

    async fn append_activity(&self, id: Uuid, entry: &ActivityLogEntry) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        match state.attendee_mut(id) {
            Some(record) => {
                record.activity_log.0.push(entry.clone());
                record.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_attendee(&self, id: Uuid) -> Result<Option<AttendeeRecord>, AppError> {
        let mut state = self.state.lock().await;
        let position = state.attendees.iter().position(|a| a.id == id);
        Ok(position.map(|index| state.attendees.remove(index)))
    }
}
