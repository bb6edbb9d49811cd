// src/services/stock_resolver.rs
//
// Decide qual regra de capacidade vale para um ingresso e quanto ainda
// está disponível. Funções puras: quem chama busca o pool e o snapshot.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    event::EventStockPool,
    stock::{Availability, StockModel},
    ticket::{GlobalStockMode, TicketProvider, TicketSnapshot},
};

pub fn resolve(ticket: &TicketSnapshot, pool: Option<&EventStockPool>) -> StockModel {
    // Sem metadado de capacidade: "não se aplica", nunca "estoque zero"
    let Some(capacity) = ticket.capacity else {
        return StockModel::NotApplicable;
    };
    if capacity < 0 || !ticket.manage_stock {
        return StockModel::Unlimited;
    }

    // Pool ausente, desligado ou de outro evento: o ingresso usa os próprios contadores
    let pool = pool.filter(|p| p.enabled && p.event_id == ticket.event_id);

    match (ticket.global_stock_mode, pool) {
        (GlobalStockMode::Global, Some(pool)) => StockModel::Shared {
            event_id: pool.event_id,
            pool_capacity: pool.capacity,
            pool_sales: pool.sales,
        },
        (GlobalStockMode::Capped, Some(pool)) => StockModel::Capped {
            event_id: pool.event_id,
            cap: capacity,
            sales: ticket.sales,
            pool_capacity: pool.capacity,
            pool_sales: pool.sales,
        },
        _ => StockModel::Own {
            capacity,
            sales: ticket.sales,
        },
    }
}

pub fn available(model: &StockModel) -> Availability {
    match *model {
        StockModel::NotApplicable | StockModel::Unlimited => Availability::Unlimited,
        StockModel::Own { capacity, sales } => Availability::Limited((capacity - sales).max(0)),
        StockModel::Shared {
            pool_capacity,
            pool_sales,
            ..
        } => Availability::Limited((pool_capacity - pool_sales).max(0)),
        // O teto do ingresso vale mesmo com sobra no pool
        StockModel::Capped {
            cap,
            sales,
            pool_capacity,
            pool_sales,
            ..
        } => Availability::Limited((cap - sales).min(pool_capacity - pool_sales).max(0)),
    }
}

// ---
// Agregado por evento
// ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TicketAggregate {
    /// Tipos de ingresso.
    pub count: i64,
    /// Soma do estoque gravado dos ingressos gerenciados.
    pub stock: i64,
    /// Quantos operam sobre um pool (global ou capped).
    pub global: i64,
    pub unlimited: i64,
    pub available: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TicketCounts {
    pub rsvp: TicketAggregate,
    pub tickets: TicketAggregate,
}

#[derive(Default)]
struct PoolShare {
    available: i64,
    has_shared: bool,
    capped_available: i64,
}

fn aggregate<'a>(
    tickets: impl Iterator<Item = &'a TicketSnapshot>,
    pools: &HashMap<Uuid, EventStockPool>,
) -> TicketAggregate {
    let mut totals = TicketAggregate::default();
    // BTreeMap: soma estável por pool, independente da ordem dos ingressos
    let mut shares: BTreeMap<Uuid, PoolShare> = BTreeMap::new();

    for ticket in tickets {
        totals.count += 1;
        if ticket.counters().is_bounded() {
            totals.stock += ticket.stock;
        }

        let model = resolve(ticket, pools.get(&ticket.event_id));
        match model {
            StockModel::NotApplicable | StockModel::Unlimited => {
                totals.unlimited += 1;
                // sentinela: "tem vaga", sem inventar um total
                totals.available += 1;
            }
            StockModel::Own { .. } => {
                if let Availability::Limited(n) = available(&model) {
                    totals.available += n;
                }
            }
            StockModel::Shared {
                event_id,
                pool_capacity,
                pool_sales,
            } => {
                totals.global += 1;
                let share = shares.entry(event_id).or_default();
                share.available = (pool_capacity - pool_sales).max(0);
                share.has_shared = true;
            }
            StockModel::Capped {
                event_id,
                pool_capacity,
                pool_sales,
                ..
            } => {
                totals.global += 1;
                let share = shares.entry(event_id).or_default();
                share.available = (pool_capacity - pool_sales).max(0);
                if let Availability::Limited(n) = available(&model) {
                    share.capped_available += n;
                }
            }
        }
    }

    // Cada pool entra uma vez só. Se só há capped nele, o teto somado limita.
    for share in shares.values() {
        totals.available += if share.has_shared {
            share.available
        } else {
            share.available.min(share.capped_available)
        };
    }

    totals
}

pub fn ticket_counts(
    tickets: &[TicketSnapshot],
    pools: &HashMap<Uuid, EventStockPool>,
) -> TicketCounts {
    TicketCounts {
        rsvp: aggregate(
            tickets.iter().filter(|t| t.provider == TicketProvider::Rsvp),
            pools,
        ),
        tickets: aggregate(
            tickets
                .iter()
                .filter(|t| t.provider == TicketProvider::Commerce),
            pools,
        ),
    }
}
