// src/services/provider_service.rs
//
// Fachada usada pelos canais de venda (RSVP e Commerce).
// Orquestra: permissão -> resolução de estoque -> motor de ajuste ->
// participantes -> invalidação de cache -> notificações.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    common::{
        currency,
        error::AppError,
        hooks::{Hooks, TicketNotice},
    },
    db::EventStore,
    models::{
        attendee::{AttendeeChanges, AttendeeData, AttendeeScope, NewAttendee},
        event::{EventRecord, EventStockPool},
        stock::ClaimOutcome,
        ticket::{GlobalStockMode, NewTicket, Ticket, TicketChanges, TicketProvider},
    },
    services::{
        attendee_service::{generate_security_code, AttendeeService},
        capability::CapabilityChecker,
        sales_engine::{SalesEngine, StatusReconciliation},
        ticket_service::TicketService,
    },
};

/// Atributos do ingresso vindos do canal de venda.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDraft {
    /// Presente = atualização de um ingresso existente.
    pub id: Option<Uuid>,
    pub provider: TicketProvider,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub price: Decimal,
    pub currency_code: Option<String>,
    #[serde(default)]
    pub menu_order: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Entrada crua de capacidade do formulário.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInput {
    #[serde(default)]
    pub mode: GlobalStockMode,
    /// `None` ou `-1` = ilimitado (modo own); teto para `capped`.
    pub capacity: Option<i64>,
    /// Capacidade do pool do evento (global/capped).
    pub event_capacity: Option<i64>,
}

/// Capacidade resolvida para gravar no ingresso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockPlan {
    pub capacity: i64,
    pub manage_stock: bool,
    pub mode: GlobalStockMode,
}

impl StockPlan {
    fn unlimited() -> Self {
        Self {
            capacity: -1,
            manage_stock: false,
            mode: GlobalStockMode::None,
        }
    }

    fn own(capacity: Option<i64>) -> Self {
        match capacity {
            Some(capacity) if capacity >= 0 => Self {
                capacity,
                manage_stock: true,
                mode: GlobalStockMode::Own,
            },
            _ => Self::unlimited(),
        }
    }
}

/// Traduz a entrada do formulário para a capacidade do ingresso,
/// dado o pool (já configurado) do evento.
pub fn plan_stock(input: StockInput, pool: Option<&EventStockPool>) -> StockPlan {
    let pool_capacity = pool.filter(|p| p.enabled).map(|p| p.capacity);

    match (input.mode, pool_capacity) {
        (GlobalStockMode::Global, Some(pool_capacity)) => StockPlan {
            capacity: pool_capacity,
            manage_stock: true,
            mode: GlobalStockMode::Global,
        },
        (GlobalStockMode::Capped, Some(pool_capacity)) => StockPlan {
            capacity: input
                .capacity
                .filter(|cap| *cap >= 0)
                .map_or(pool_capacity, |cap| cap.min(pool_capacity)),
            manage_stock: true,
            mode: GlobalStockMode::Capped,
        },
        (GlobalStockMode::Global | GlobalStockMode::Capped, None) => {
            tracing::warn!(mode = input.mode.as_str(), "evento sem estoque compartilhado: usando estoque próprio");
            StockPlan::own(input.capacity)
        }
        (GlobalStockMode::None | GlobalStockMode::Own, _) => StockPlan::own(input.capacity),
    }
}

/// Teto de participantes gerados por chamada.
pub const MAX_ATTENDEES_PER_REQUEST: i64 = 500;

#[derive(Clone)]
pub struct ProviderService {
    tickets: TicketService,
    attendees: AttendeeService,
    sales: SalesEngine,
    events: Arc<dyn EventStore>,
    capabilities: Arc<dyn CapabilityChecker>,
    hooks: Arc<Hooks>,
    default_currency: String,
}

impl ProviderService {
    pub fn new(
        tickets: TicketService,
        attendees: AttendeeService,
        sales: SalesEngine,
        events: Arc<dyn EventStore>,
        capabilities: Arc<dyn CapabilityChecker>,
        hooks: Arc<Hooks>,
        default_currency: String,
    ) -> Self {
        Self {
            tickets,
            attendees,
            sales,
            events,
            capabilities,
            hooks,
            default_currency,
        }
    }

    pub async fn can_manage_event(&self, actor: Option<Uuid>, event_id: Uuid) -> Result<bool, AppError> {
        let allowed = self.capabilities.can_manage_event(actor, event_id).await?;
        if !allowed {
            tracing::info!(%event_id, ?actor, "operação negada: sem permissão no evento");
        }
        Ok(allowed)
    }

    // ---
    // Eventos e estoque compartilhado
    // ---

    pub async fn create_event(&self, title: &str, author_id: Option<Uuid>) -> Result<EventRecord, AppError> {
        let event = self.events.insert_event(title, author_id).await?;
        tracing::info!(event_id = %event.id, "evento criado");
        Ok(event)
    }

    /// Atualiza o evento. Os ingressos dele continuam no cache.
    pub async fn rename_event(
        &self,
        event_id: Uuid,
        title: &str,
        actor: Option<Uuid>,
    ) -> Result<Option<EventRecord>, AppError> {
        if !self.can_manage_event(actor, event_id).await? {
            return Ok(None);
        }
        let Some(event) = self.events.rename_event(event_id, title).await? else {
            return Ok(None);
        };
        self.tickets.parent_updated(event_id).await?;
        Ok(Some(event))
    }

    /// Liga/desliga o pool do evento e alinha a capacidade dos ingressos que o usam.
    pub async fn configure_shared_stock(
        &self,
        event_id: Uuid,
        enabled: bool,
        capacity: i64,
        actor: Option<Uuid>,
    ) -> Result<Option<EventStockPool>, AppError> {
        if capacity < 0 {
            return Err(AppError::InvalidFieldValue {
                field: EventStockPool::CAPACITY_KEY.into(),
                reason: "a capacidade do evento não pode ser negativa".into(),
            });
        }
        if self.events.find_event(event_id).await?.is_none() {
            return Err(AppError::EventNotFound);
        }
        if !self.can_manage_event(actor, event_id).await? {
            return Ok(None);
        }

        let pool = self.events.configure_pool(event_id, enabled, capacity).await?;

        // Ingressos global acompanham o pool; capped nunca passam dele. Ilimitados ficam como estão.
        for snapshot in self.tickets.event_tickets(event_id).await? {
            if !snapshot.counters().is_bounded() {
                continue;
            }
            let capacity = match (snapshot.global_stock_mode, snapshot.capacity) {
                (GlobalStockMode::Global, _) => Some(pool.capacity),
                (GlobalStockMode::Capped, Some(cap)) if cap > pool.capacity => Some(pool.capacity),
                _ => None,
            };
            if let Some(capacity) = capacity {
                let changes = TicketChanges {
                    capacity: Some(capacity),
                    ..Default::default()
                };
                self.tickets.save_changes(snapshot.id, &changes).await?;
            }
        }

        Ok(Some(pool))
    }

    // ---
    // Ingressos
    // ---

    /// Cria ou atualiza um ingresso. `None` quando o ator não pode gerenciar o evento.
    pub async fn save_ticket(
        &self,
        event_id: Uuid,
        draft: TicketDraft,
        stock: StockInput,
        actor: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError> {
        // 1. Evento e permissão
        if self.events.find_event(event_id).await?.is_none() {
            return Err(AppError::EventNotFound);
        }
        if !self.can_manage_event(actor, event_id).await? {
            return Ok(None);
        }

        // 2. Pool do evento (configurado antes, se o formulário trouxe a capacidade)
        let pool = match (stock.mode.uses_pool(), stock.event_capacity) {
            (true, Some(event_capacity)) if event_capacity >= 0 => {
                Some(self.events.configure_pool(event_id, true, event_capacity).await?)
            }
            (true, _) => self.events.find_pool(event_id).await?,
            (false, _) => None,
        };
        let plan = plan_stock(stock, pool.as_ref());

        // 3. Preço e moeda
        let price = match draft.provider {
            TicketProvider::Rsvp => Decimal::ZERO,
            TicketProvider::Commerce => draft.price,
        };
        let currency_code = draft
            .currency_code
            .as_deref()
            .unwrap_or(&self.default_currency)
            .to_ascii_uppercase();
        let currency_symbol = currency::symbol_for(&currency_code)
            .map(str::to_string)
            .unwrap_or_else(|| currency_code.clone());

        // 4a. Atualização
        if let Some(ticket_id) = draft.id {
            let existing = self.tickets.get_snapshot(ticket_id).await?;
            if existing.is_none_or(|t| t.event_id != event_id) {
                return Err(AppError::TicketNotFound);
            }

            let changes = TicketChanges {
                name: Some(draft.name),
                description: Some(draft.description),
                price: Some(price),
                currency_code: Some(currency_code),
                currency_symbol: Some(currency_symbol),
                menu_order: Some(draft.menu_order),
                start_date: Some(draft.start_date),
                end_date: Some(draft.end_date),
                capacity: Some(plan.capacity),
                manage_stock: Some(plan.manage_stock),
                global_stock_mode: Some(plan.mode),
            };
            return Ok(self
                .tickets
                .save_changes(ticket_id, &changes)
                .await?
                .map(|ticket| ticket.id));
        }

        // 4b. Criação
        self.hooks.notify(TicketNotice::BeforeTicketCreate {
            event_id,
            name: draft.name.clone(),
            provider: draft.provider,
        });

        let ticket = self
            .tickets
            .create(&NewTicket {
                event_id,
                provider: draft.provider,
                name: draft.name,
                description: draft.description,
                price,
                currency_code,
                currency_symbol,
                menu_order: draft.menu_order,
                start_date: draft.start_date,
                end_date: draft.end_date,
                capacity: Some(plan.capacity),
                manage_stock: plan.manage_stock,
                global_stock_mode: plan.mode,
            })
            .await?;

        self.hooks.notify(TicketNotice::TicketCreated {
            event_id,
            ticket: ticket.clone(),
        });
        self.hooks.notify(TicketNotice::AfterTicketSave {
            event_id,
            ticket: ticket.clone(),
        });
        Ok(Some(ticket.id))
    }

    /// Remove o ingresso (soft delete). Os participantes guardam o nome do produto.
    pub async fn delete_ticket(
        &self,
        event_id: Uuid,
        ticket_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let Some(ticket) = self.tickets.get_ticket(ticket_id).await? else {
            return Ok(false);
        };
        if ticket.event_id != event_id || !self.can_manage_event(actor, event_id).await? {
            return Ok(false);
        }

        // 1. Uma escrita para todos os participantes
        let marked = self
            .attendees
            .bulk_update(
                AttendeeScope::Ticket(ticket_id),
                &AttendeeChanges {
                    deleted_product_name: Some(ticket.name.clone()),
                    ..Default::default()
                },
            )
            .await?;

        // 2. Soft delete + invalidação
        if !self.tickets.trash(ticket_id).await? {
            return Ok(false);
        }

        tracing::info!(%ticket_id, %event_id, attendees = marked, "ingresso removido");
        self.hooks.notify(TicketNotice::TicketDeleted { event_id, ticket });
        Ok(true)
    }

    // ---
    // Participantes
    // ---

    fn default_status(provider: TicketProvider) -> &'static str {
        match provider {
            TicketProvider::Rsvp => "yes",
            TicketProvider::Commerce => "completed",
        }
    }

    /// Reserva o estoque e só então cria os participantes.
    /// `None` = ingresso inexistente, fora da janela de vendas ou sem estoque.
    pub async fn generate_attendees_for(
        &self,
        ticket_id: Uuid,
        quantity: i64,
        data: AttendeeData,
    ) -> Result<Option<Vec<Uuid>>, AppError> {
        if quantity < 0 {
            return Err(AppError::InvalidFieldValue {
                field: "quantity".into(),
                reason: "não pode ser negativa".into(),
            });
        }
        if quantity > MAX_ATTENDEES_PER_REQUEST {
            return Err(AppError::InvalidFieldValue {
                field: "quantity".into(),
                reason: format!("no máximo {MAX_ATTENDEES_PER_REQUEST} por pedido"),
            });
        }

        let Some(ticket) = self.tickets.get_ticket(ticket_id).await? else {
            return Ok(None);
        };
        if quantity == 0 {
            return Ok(Some(Vec::new()));
        }
        if !ticket.is_on_sale(Utc::now()) {
            tracing::info!(%ticket_id, "fora da janela de vendas");
            return Ok(None);
        }

        let status = data
            .status
            .clone()
            .unwrap_or_else(|| Self::default_status(ticket.provider).to_string());
        let units = self
            .sales
            .status_options()
            .weight(ticket.provider, &status)
            .checked_mul(quantity)
            .ok_or_else(|| AppError::InvalidFieldValue {
                field: "quantity".into(),
                reason: "quantidade fora do intervalo para o peso do status".into(),
            })?;

        // 1. Estoque primeiro: sem venda, sem participante
        if units > 0 {
            match self.sales.claim(ticket_id, units).await? {
                ClaimOutcome::Sold(_) => {}
                ClaimOutcome::Insufficient { available } => {
                    tracing::info!(%ticket_id, units, available, "sem estoque para os participantes");
                    return Ok(None);
                }
                ClaimOutcome::NotFound => return Ok(None),
            }
        }

        // 2. Participantes (tudo ou nada)
        let batch: Vec<NewAttendee> = (0..quantity)
            .map(|_| NewAttendee {
                ticket_id,
                event_id: ticket.event_id,
                provider: ticket.provider,
                full_name: data.full_name.clone(),
                email: data.email.clone(),
                security_code: generate_security_code(),
                status: status.clone(),
                user_id: data.user_id,
                optout: data.optout,
            })
            .collect();

        let created = match self.attendees.create_batch(&batch).await {
            Ok(created) => created,
            Err(e) => {
                // Compensa a venda já confirmada
                if units > 0 {
                    if let Err(undo) = self.sales.decrease_ticket_sales_by(ticket_id, units).await {
                        tracing::error!(%ticket_id, units, "falha ao estornar a venda: {}", undo);
                    }
                }
                return Err(e);
            }
        };

        let ticket = self.refreshed(ticket).await?;
        for attendee in &created {
            self.hooks.notify(TicketNotice::AttendeeCreated {
                attendee: attendee.clone(),
                ticket: ticket.clone(),
            });
        }

        Ok(Some(created.into_iter().map(|a| a.id).collect()))
    }

    async fn refreshed(&self, ticket: Ticket) -> Result<Ticket, AppError> {
        Ok(self.tickets.get_ticket(ticket.id).await?.unwrap_or(ticket))
    }

    /// Troca o status e reconcilia o estoque pelo peso de cada status.
    /// Um aumento que não cabe no estoque é recusado e o status não muda.
    pub async fn change_attendee_status(
        &self,
        attendee_id: Uuid,
        new_status: &str,
        actor: Option<Uuid>,
    ) -> Result<Option<StatusReconciliation>, AppError> {
        let Some(attendee) = self.attendees.find(attendee_id).await? else {
            return Ok(None);
        };
        let is_holder = actor.is_some() && attendee.user_id == actor;
        if !is_holder && !self.can_manage_event(actor, attendee.event_id).await? {
            return Ok(None);
        }

        let reconciliation = self
            .sales
            .reconcile_status_strict(
                attendee.ticket_id,
                attendee.provider,
                &attendee.status,
                new_status,
                1,
            )
            .await?;

        if let StatusReconciliation::Rejected { .. } = reconciliation {
            return Ok(Some(reconciliation));
        }
        if attendee.status != new_status {
            self.attendees
                .update(
                    attendee_id,
                    &AttendeeChanges {
                        status: Some(new_status.to_string()),
                        ..Default::default()
                    },
                )
                .await?;
        }
        Ok(Some(reconciliation))
    }

    /// Remove o participante e devolve ao estoque o que ele consumia.
    pub async fn delete_attendee(&self, attendee_id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        let Some(attendee) = self.attendees.find(attendee_id).await? else {
            return Ok(false);
        };
        if !self.can_manage_event(actor, attendee.event_id).await? {
            return Ok(false);
        }
        if self.attendees.delete(attendee_id).await?.is_none() {
            return Ok(false);
        }

        let weight = self
            .sales
            .status_options()
            .weight(attendee.provider, &attendee.status);
        if weight > 0 {
            self.sales
                .decrease_ticket_sales_by(attendee.ticket_id, weight)
                .await?;
        }

        tracing::info!(%attendee_id, ticket_id = %attendee.ticket_id, "participante removido");
        Ok(true)
    }
}
