// src/services/ticket_service.rs
//
// Repositório de ingressos visto pelo resto do sistema: leitura através do
// cache, edição por builder, duplicação, listagem com filtros e agregados.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    common::{
        currency,
        error::AppError,
        hooks::{Hooks, TicketNotice},
    },
    db::{EventStore, TicketStore},
    models::{
        event::{EventFlags, EventStockPool},
        fields::TicketField,
        query::{ResolvedTicketQuery, TicketQuery},
        ticket::{GlobalStockMode, NewTicket, Ticket, TicketChanges, TicketRecord, TicketSnapshot},
    },
    services::{
        stock_resolver::{self, TicketCounts},
        ticket_cache::{CacheSignal, TicketCache},
    },
};

#[derive(Clone)]
pub struct TicketService {
    tickets: Arc<dyn TicketStore>,
    events: Arc<dyn EventStore>,
    cache: Arc<dyn TicketCache>,
    hooks: Arc<Hooks>,
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        events: Arc<dyn EventStore>,
        cache: Arc<dyn TicketCache>,
        hooks: Arc<Hooks>,
    ) -> Self {
        Self {
            tickets,
            events,
            cache,
            hooks,
        }
    }

    // ---
    // Leitura
    // ---

    /// Snapshot cru, lido através do cache.
    pub async fn get_snapshot(&self, id: Uuid) -> Result<Option<TicketSnapshot>, AppError> {
        if let Some(snapshot) = self.cache.get(id) {
            tracing::debug!(ticket_id = %id, "cache hit");
            return Ok(Some(snapshot));
        }

        tracing::debug!(ticket_id = %id, "cache miss");
        let version = self.cache.version(id);
        let Some(record) = self.tickets.find_ticket(id).await? else {
            return Ok(None);
        };
        let snapshot = TicketSnapshot::try_from(record)?;
        self.cache.set(&snapshot, version);
        Ok(Some(snapshot))
    }

    /// Objeto completo. O pool do evento é sempre lido na hora, fora do cache.
    pub async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, AppError> {
        let Some(snapshot) = self.get_snapshot(id).await? else {
            return Ok(None);
        };
        let pool = self.pool_for(&snapshot).await?;
        Ok(Some(Ticket::from_snapshot(&snapshot, pool.as_ref())?))
    }

    pub async fn get_field(&self, id: Uuid, key: &str) -> Result<Option<Value>, AppError> {
        let field: TicketField = key.parse()?;
        Ok(self.get_snapshot(id).await?.map(|s| s.field(field)))
    }

    async fn pool_for(&self, snapshot: &TicketSnapshot) -> Result<Option<EventStockPool>, AppError> {
        if !snapshot.global_stock_mode.uses_pool() {
            return Ok(None);
        }
        self.events.find_pool(snapshot.event_id).await
    }

    // ---
    // Escrita
    // ---

    pub async fn create(&self, ticket: &NewTicket) -> Result<Ticket, AppError> {
        let record = self.tickets.insert_ticket(ticket).await?;
        self.materialize(record).await
    }

    /// Grava as mudanças numa única escrita e invalida o cache antes de devolver.
    pub async fn save_changes(
        &self,
        id: Uuid,
        changes: &TicketChanges,
    ) -> Result<Option<Ticket>, AppError> {
        if changes.is_empty() {
            return self.get_ticket(id).await;
        }

        let Some(record) = self.tickets.update_ticket(id, changes).await? else {
            return Ok(None);
        };
        self.cache.signal(id, CacheSignal::Saved);

        let ticket = self.materialize(record).await?;
        self.hooks.notify(TicketNotice::AfterTicketSave {
            event_id: ticket.event_id,
            ticket: ticket.clone(),
        });
        Ok(Some(ticket))
    }

    pub fn edit(&self, id: Uuid) -> TicketEditor<'_> {
        TicketEditor {
            service: self,
            id,
            changes: TicketChanges::default(),
            manage_stock_explicit: false,
        }
    }

    /// Copia atributos e configuração de capacidade para um registro novo,
    /// com inventário independente (vendas zeradas, estoque cheio).
    pub async fn duplicate(&self, id: Uuid) -> Result<Option<Ticket>, AppError> {
        let Some(source) = self.tickets.find_ticket(id).await? else {
            return Ok(None);
        };

        let copy = NewTicket {
            event_id: source.event_id,
            provider: source.provider.parse()?,
            name: source.name.clone(),
            description: source.description.clone(),
            price: source.price,
            currency_code: source.currency_code.clone(),
            currency_symbol: source.currency_symbol.clone(),
            menu_order: source.menu_order,
            start_date: source.start_date,
            end_date: source.end_date,
            capacity: source.capacity,
            manage_stock: source.manage_stock,
            global_stock_mode: source.mode(),
        };

        let ticket = self.create(&copy).await?;
        tracing::info!(source_id = %id, ticket_id = %ticket.id, "ingresso duplicado");
        self.hooks.notify(TicketNotice::TicketCreated {
            event_id: ticket.event_id,
            ticket: ticket.clone(),
        });
        Ok(Some(ticket))
    }

    pub async fn trash(&self, id: Uuid) -> Result<bool, AppError> {
        let trashed = self.tickets.soft_delete_ticket(id).await?;
        if trashed {
            self.cache.signal(id, CacheSignal::Trashed);
        }
        Ok(trashed)
    }

    async fn materialize(&self, record: TicketRecord) -> Result<Ticket, AppError> {
        let snapshot = TicketSnapshot::try_from(record)?;
        let pool = self.pool_for(&snapshot).await?;
        Ticket::from_snapshot(&snapshot, pool.as_ref())
    }

    // ---
    // Listagem
    // ---

    /// Aplica o remapeamento de eventos (uma vez) e normaliza a moeda.
    pub fn resolve_query(&self, query: TicketQuery) -> ResolvedTicketQuery {
        ResolvedTicketQuery {
            event_ids: query.event_ids.map(|ids| self.hooks.ticket_event_ids.apply(ids)),
            provider: query.provider,
            cost: query.cost,
            currency: query.currency.as_deref().map(currency::resolve),
            attendee_id: query.attendee_id,
            attendee_user_id: query.attendee_user_id,
        }
    }

    async fn fetch(
        &self,
        query: TicketQuery,
    ) -> Result<(Vec<TicketSnapshot>, HashMap<Uuid, EventStockPool>), AppError> {
        let resolved = self.resolve_query(query);
        if resolved.event_ids.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Ok((Vec::new(), HashMap::new()));
        }

        let records = self.tickets.list_tickets(&resolved).await?;
        let snapshots = records
            .into_iter()
            .map(TicketSnapshot::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let pool_events: Vec<Uuid> = snapshots
            .iter()
            .filter(|s| s.global_stock_mode.uses_pool())
            .map(|s| s.event_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let pools = self
            .events
            .find_pools(&pool_events)
            .await?
            .into_iter()
            .map(|pool| (pool.event_id, pool))
            .collect();

        // Listagem não alimenta o cache: só a leitura por ID, com versão
        Ok((snapshots, pools))
    }

    /// Ingressos gravados no próprio evento, sem remapeamento.
    pub async fn event_tickets(&self, event_id: Uuid) -> Result<Vec<TicketSnapshot>, AppError> {
        let query = ResolvedTicketQuery {
            event_ids: Some(vec![event_id]),
            ..Default::default()
        };
        self.tickets
            .list_tickets(&query)
            .await?
            .into_iter()
            .map(TicketSnapshot::try_from)
            .collect()
    }

    /// O evento mudou: os ingressos recebem o sinal, que não invalida nada.
    pub async fn parent_updated(&self, event_id: Uuid) -> Result<(), AppError> {
        for snapshot in self.event_tickets(event_id).await? {
            self.cache
                .signal(snapshot.id, CacheSignal::ParentUpdated(event_id));
        }
        Ok(())
    }

    pub async fn list(&self, query: TicketQuery) -> Result<Vec<Ticket>, AppError> {
        let (snapshots, pools) = self.fetch(query).await?;
        snapshots
            .iter()
            .map(|s| Ticket::from_snapshot(s, pools.get(&s.event_id)))
            .collect()
    }

    /// Agregados de RSVP e ingressos do evento (com o remapeamento aplicado).
    pub async fn ticket_counts(&self, event_id: Uuid) -> Result<TicketCounts, AppError> {
        let (snapshots, pools) = self.fetch(TicketQuery::for_event(event_id)).await?;
        Ok(stock_resolver::ticket_counts(&snapshots, &pools))
    }

    /// Filtra eventos por "tem ingressos / tem RSVP / tem participantes".
    pub async fn events_with(
        &self,
        candidates: &[Uuid],
        flags: EventFlags,
    ) -> Result<Vec<Uuid>, AppError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Eventos cujos participantes vêm de outro lugar: uma chamada por consulta
        let injected = self.hooks.events_with_injected_attendees.apply(Vec::new());

        let presence: HashMap<Uuid, _> = self
            .events
            .ticket_presence(candidates)
            .await?
            .into_iter()
            .map(|p| (p.event_id, p))
            .collect();

        let matches = |wanted: Option<bool>, actual: bool| wanted.is_none_or(|w| w == actual);

        Ok(candidates
            .iter()
            .copied()
            .filter(|event_id| {
                let (tickets, rsvps, attendees) = presence
                    .get(event_id)
                    .map_or((0, 0, 0), |p| (p.tickets, p.rsvps, p.attendees));
                let has_attendees = attendees > 0 || injected.contains(event_id);

                matches(flags.has_tickets, tickets > 0)
                    && matches(flags.has_rsvp, rsvps > 0)
                    && matches(flags.has_attendees, has_attendees)
            })
            .collect())
    }
}

// ---
// Builder de edição
// ---

/// Acumula atribuições e grava tudo num único save.
pub struct TicketEditor<'a> {
    service: &'a TicketService,
    id: Uuid,
    changes: TicketChanges,
    manage_stock_explicit: bool,
}

impl TicketEditor<'_> {
    /// Atribuição por chave durável (`_capacity`, `_price`...).
    pub fn set(mut self, key: &str, value: Value) -> Result<Self, AppError> {
        let field: TicketField = key.parse()?;
        field.assign(&mut self.changes, value)?;
        if field == TicketField::ManageStock {
            self.manage_stock_explicit = true;
        }
        Ok(self)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.changes.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.changes.description = Some(description);
        self
    }

    pub fn price(mut self, price: Decimal) -> Self {
        self.changes.price = Some(price);
        self
    }

    pub fn menu_order(mut self, order: i32) -> Self {
        self.changes.menu_order = Some(order);
        self
    }

    pub fn sale_window(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.changes.start_date = Some(start);
        self.changes.end_date = Some(end);
        self
    }

    /// `-1` = ilimitado.
    pub fn capacity(mut self, capacity: i64) -> Self {
        self.changes.capacity = Some(capacity.max(-1));
        self
    }

    pub fn manage_stock(mut self, managed: bool) -> Self {
        self.changes.manage_stock = Some(managed);
        self.manage_stock_explicit = true;
        self
    }

    pub fn global_stock_mode(mut self, mode: GlobalStockMode) -> Self {
        self.changes.global_stock_mode = Some(mode);
        self
    }

    pub fn changes(&self) -> &TicketChanges {
        &self.changes
    }

    pub async fn commit(mut self) -> Result<Option<Ticket>, AppError> {
        // Capacidade finita liga o controle de estoque, -1 desliga (salvo escolha explícita)
        if let (Some(capacity), false) = (self.changes.capacity, self.manage_stock_explicit) {
            self.changes.manage_stock = Some(capacity >= 0);
        }
        self.service.save_changes(self.id, &self.changes).await
    }
}
