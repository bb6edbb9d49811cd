// src/models/ticket.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        event::EventStockPool,
        stock::{Availability, StockCounters, StockModel},
    },
    services::stock_resolver,
};

// --- Enums ---

/// Canal de venda dono do ingresso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketProvider {
    Rsvp,
    Commerce,
}

impl TicketProvider {
    pub const ALL: [TicketProvider; 2] = [TicketProvider::Rsvp, TicketProvider::Commerce];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketProvider::Rsvp => "rsvp",
            TicketProvider::Commerce => "commerce",
        }
    }
}

impl fmt::Display for TicketProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketProvider {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "rsvp" => Ok(TicketProvider::Rsvp),
            "commerce" => Ok(TicketProvider::Commerce),
            other => Err(AppError::InvalidStoredValue(format!("provider '{other}'"))),
        }
    }
}

/// Como o ingresso participa do estoque do evento.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalStockMode {
    #[default]
    None,
    Own,
    Global,
    Capped,
}

impl GlobalStockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalStockMode::None => "none",
            GlobalStockMode::Own => "own",
            GlobalStockMode::Global => "global",
            GlobalStockMode::Capped => "capped",
        }
    }

    /// Modos que consomem o pool do evento (quando o pool está habilitado).
    pub fn uses_pool(&self) -> bool {
        matches!(self, GlobalStockMode::Global | GlobalStockMode::Capped)
    }

    // Valores antigos/desconhecidos no banco viram `None` (não participa do pool).
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for GlobalStockMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "" | "none" => Ok(GlobalStockMode::None),
            "own" => Ok(GlobalStockMode::Own),
            "global" => Ok(GlobalStockMode::Global),
            "capped" => Ok(GlobalStockMode::Capped),
            other => Err(AppError::InvalidFieldValue {
                field: "_global_stock_mode".into(),
                reason: format!("modo desconhecido '{other}'"),
            }),
        }
    }
}

// ---
// 1. TicketRecord: a linha da tabela `tickets`
// ---
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TicketRecord {
    pub id: Uuid,
    pub event_id: Uuid,
    pub provider: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency_code: String,
    pub currency_symbol: String,
    pub menu_order: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub capacity: Option<i64>,
    pub total_sales: i64,
    pub stock: i64,
    pub manage_stock: bool,
    pub global_stock_mode: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TicketRecord {
    pub fn counters(&self) -> StockCounters {
        StockCounters {
            sales: self.total_sales,
            stock: self.stock,
            capacity: self.capacity,
            managed: self.manage_stock,
        }
    }

    pub fn mode(&self) -> GlobalStockMode {
        GlobalStockMode::from_stored(&self.global_stock_mode)
    }

    /// Consome o pool do evento: modo global/capped com capacidade finita.
    /// Ingresso ilimitado nunca entra no pool, mesmo marcado como global.
    pub fn shares_pool(&self) -> bool {
        self.mode().uses_pool() && self.counters().is_bounded()
    }

    /// RSVPs não têm preço: para filtros de custo valem 0.
    pub fn effective_cost(&self) -> Decimal {
        if self.provider == TicketProvider::Rsvp.as_str() {
            Decimal::ZERO
        } else {
            self.price
        }
    }
}

// ---
// 2. TicketSnapshot: a entrada de cache
// ---
// Só tipos primitivos/serializáveis. Nada de referência para pool ou evento:
// disponibilidade compartilhada é sempre lida na hora.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSnapshot {
    pub id: Uuid,
    pub event_id: Uuid,
    pub provider: TicketProvider,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub currency_code: String,
    pub currency_symbol: String,
    pub menu_order: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub capacity: Option<i64>,
    pub sales: i64,
    pub stock: i64,
    pub manage_stock: bool,
    pub global_stock_mode: GlobalStockMode,
}

impl TryFrom<TicketRecord> for TicketSnapshot {
    type Error = AppError;

    fn try_from(record: TicketRecord) -> Result<Self, Self::Error> {
        let global_stock_mode = record.mode();
        Ok(Self {
            id: record.id,
            event_id: record.event_id,
            provider: record.provider.parse()?,
            name: record.name,
            description: record.description,
            price: record.price.to_string(),
            currency_code: record.currency_code,
            currency_symbol: record.currency_symbol,
            menu_order: record.menu_order,
            start_date: record.start_date,
            end_date: record.end_date,
            capacity: record.capacity,
            sales: record.total_sales,
            stock: record.stock,
            manage_stock: record.manage_stock,
            global_stock_mode,
        })
    }
}

impl TicketSnapshot {
    pub fn counters(&self) -> StockCounters {
        StockCounters {
            sales: self.sales,
            stock: self.stock,
            capacity: self.capacity,
            managed: self.manage_stock,
        }
    }
}

// ---
// 3. Ticket: o objeto de valor completo, tipado
// ---
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub provider: TicketProvider,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency_code: String,
    pub currency_symbol: String,
    pub menu_order: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub capacity: Option<i64>,
    pub sales: i64,
    pub stock: i64,
    pub manage_stock: bool,
    pub global_stock_mode: GlobalStockMode,
    pub stock_model: StockModel,
    pub available: Availability,
}

impl Ticket {
    /// Único ponto que transforma o snapshot (campos crus) no objeto tipado.
    pub fn from_snapshot(
        snapshot: &TicketSnapshot,
        pool: Option<&EventStockPool>,
    ) -> Result<Self, AppError> {
        let price = snapshot
            .price
            .parse::<Decimal>()
            .map_err(|e| AppError::InvalidStoredValue(format!("_price '{}': {e}", snapshot.price)))?;

        let stock_model = stock_resolver::resolve(snapshot, pool);

        Ok(Self {
            id: snapshot.id,
            event_id: snapshot.event_id,
            provider: snapshot.provider,
            name: snapshot.name.clone(),
            description: snapshot.description.clone(),
            price,
            currency_code: snapshot.currency_code.clone(),
            currency_symbol: snapshot.currency_symbol.clone(),
            menu_order: snapshot.menu_order,
            start_date: snapshot.start_date,
            end_date: snapshot.end_date,
            capacity: snapshot.capacity,
            sales: snapshot.sales,
            stock: snapshot.stock,
            manage_stock: snapshot.manage_stock,
            global_stock_mode: snapshot.global_stock_mode,
            stock_model,
            available: stock_resolver::available(&stock_model),
        })
    }

    /// Dentro da janela de vendas (limites abertos quando ausentes).
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        let started = self.start_date.is_none_or(|start| start <= now);
        let not_ended = self.end_date.is_none_or(|end| now <= end);
        started && not_ended
    }
}

// ---
// 4. Escrita
// ---

/// Dados para inserir um ingresso novo (estoque já resolvido).
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub event_id: Uuid,
    pub provider: TicketProvider,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency_code: String,
    pub currency_symbol: String,
    pub menu_order: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub capacity: Option<i64>,
    pub manage_stock: bool,
    pub global_stock_mode: GlobalStockMode,
}

impl NewTicket {
    /// Estoque inicial: a capacidade inteira (ou 0 se ilimitado).
    pub fn initial_stock(&self) -> i64 {
        match self.capacity {
            Some(capacity) if self.manage_stock && capacity >= 0 => capacity,
            _ => 0,
        }
    }
}

/// Alterações acumuladas pelo `TicketEditor`, gravadas num único save.
/// `Option<Option<_>>` = campo anulável: `Some(None)` limpa o valor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub currency_code: Option<String>,
    pub currency_symbol: Option<String>,
    pub menu_order: Option<i32>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    /// Mudar a capacidade recalcula o estoque no banco a partir das vendas atuais.
    pub capacity: Option<i64>,
    pub manage_stock: Option<bool>,
    pub global_stock_mode: Option<GlobalStockMode>,
}

impl TicketChanges {
    pub fn is_empty(&self) -> bool {
        *self == TicketChanges::default()
    }

    /// Aplica as mudanças na linha já travada. Os dois stores usam esta mesma função.
    pub fn apply_to(&self, record: &mut TicketRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(price) = self.price {
            record.price = price;
        }
        if let Some(code) = &self.currency_code {
            record.currency_code = code.clone();
        }
        if let Some(symbol) = &self.currency_symbol {
            record.currency_symbol = symbol.clone();
        }
        if let Some(order) = self.menu_order {
            record.menu_order = order;
        }
        if let Some(start) = self.start_date {
            record.start_date = start;
        }
        if let Some(end) = self.end_date {
            record.end_date = end;
        }
        if let Some(mode) = self.global_stock_mode {
            record.global_stock_mode = mode.as_str().to_string();
        }
        if let Some(managed) = self.manage_stock {
            record.manage_stock = managed;
        }
        if let Some(capacity) = self.capacity {
            record.capacity = Some(capacity);
        }

        // Estoque nunca é gravado direto: deriva da capacidade e das vendas atuais.
        if self.capacity.is_some() || self.manage_stock.is_some() {
            record.stock = match record.capacity {
                Some(capacity) if record.manage_stock => {
                    stock_for_capacity(capacity, record.total_sales)
                }
                _ => 0,
            };
        }
        record.updated_at = Utc::now();
    }
}

/// Vendas que o pool do evento recebe (+) ou devolve (-) quando uma edição
/// faz o ingresso entrar ou sair dele. `shared_before` é o estado antes da edição.
pub fn pool_transfer(shared_before: bool, record: &TicketRecord) -> i64 {
    match (shared_before, record.shares_pool()) {
        (false, true) => record.total_sales,
        (true, false) => -record.total_sales,
        _ => 0,
    }
}

/// Estoque recalculado depois de uma mudança de capacidade.
pub fn stock_for_capacity(capacity: i64, sales: i64) -> i64 {
    if capacity < 0 { 0 } else { (capacity - sales).max(0) }
}
