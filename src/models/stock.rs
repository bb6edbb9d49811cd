// src/models/stock.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---
// Contadores de estoque (a "linha" que o motor de ajuste altera)
// ---

/// Vendas/estoque/capacidade de um registro: o ingresso ou o pool do evento.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockCounters {
    pub sales: i64,
    pub stock: i64,
    pub capacity: Option<i64>,
    pub managed: bool,
}

/// Resultado da aplicação de um delta sobre os contadores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedDelta {
    pub counters: StockCounters,
    /// Delta efetivamente aplicado em `sales` (pode ser menor que o pedido num estorno).
    pub applied: i64,
    /// Algum dos limites (vendas >= 0, 0 <= estoque <= capacidade) foi acionado.
    pub saturated: bool,
}

impl StockCounters {
    /// Capacidade finita e estoque gerenciado.
    pub fn is_bounded(&self) -> bool {
        self.managed && matches!(self.capacity, Some(capacity) if capacity >= 0)
    }

    /// Regra única de clamp do motor de ajuste.
    ///
    /// `sales' = max(sales + delta, 0)`, `applied = sales' - sales` e, para registros
    /// limitados, `stock' = clamp(stock - applied, 0, capacity)`.
    /// O SQL em `db::ticket_repo` expressa exatamente a mesma conta.
    pub fn apply(self, delta: i64) -> AppliedDelta {
        let requested_sales = self.sales.saturating_add(delta);
        let sales = requested_sales.max(0);
        let applied = sales - self.sales;
        let mut saturated = requested_sales < 0;

        let stock = match self.capacity {
            Some(capacity) if self.is_bounded() => {
                let requested_stock = self.stock - applied;
                let clamped = requested_stock.clamp(0, capacity);
                saturated |= clamped != requested_stock;
                clamped
            }
            _ => self.stock,
        };

        AppliedDelta {
            counters: StockCounters { sales, stock, ..self },
            applied,
            saturated,
        }
    }

    /// Guarda de admissão: há estoque para `quantity` unidades?
    pub fn admits(&self, quantity: i64) -> bool {
        !self.is_bounded() || self.stock >= quantity
    }
}

// ---
// Pedido e resultado de ajuste (contrato entre o motor e os stores)
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentRequest {
    pub delta: i64,
    /// `true` = venda com controle de admissão (falha se não houver estoque).
    pub guarded: bool,
}

impl AdjustmentRequest {
    pub fn saturating(delta: i64) -> Self {
        Self { delta, guarded: false }
    }

    pub fn guarded(quantity: i64) -> Self {
        Self { delta: quantity, guarded: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolCounters {
    pub event_id: Uuid,
    pub sales: i64,
    pub stock: i64,
}

/// Ajuste confirmado. `saturated` distingue "sucesso no limite" de sucesso normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesAdjustment {
    pub ticket_id: Uuid,
    pub sales: i64,
    pub stock: i64,
    pub applied: i64,
    pub saturated: bool,
    pub pool: Option<PoolCounters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentOutcome {
    NotFound,
    Rejected { available: i64 },
    Applied(SalesAdjustment),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ClaimOutcome {
    Sold(SalesAdjustment),
    Insufficient { available: i64 },
    NotFound,
}

// ---
// Modelo de capacidade resolvido
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Availability {
    Unlimited,
    Limited(i64),
}

impl Availability {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Availability::Unlimited)
    }

    pub fn admits(&self, quantity: i64) -> bool {
        match self {
            Availability::Unlimited => true,
            Availability::Limited(available) => *available >= quantity,
        }
    }
}

/// Qual regra de capacidade vale para um ingresso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum StockModel {
    /// Sem metadado de capacidade. Quem chama trata como ilimitado, nunca como zero.
    NotApplicable,
    Unlimited,
    Own { capacity: i64, sales: i64 },
    Shared { event_id: Uuid, pool_capacity: i64, pool_sales: i64 },
    Capped {
        event_id: Uuid,
        cap: i64,
        sales: i64,
        pool_capacity: i64,
        pool_sales: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded(sales: i64, stock: i64, capacity: i64) -> StockCounters {
        StockCounters { sales, stock, capacity: Some(capacity), managed: true }
    }

    #[test]
    fn sale_moves_one_unit_from_stock_to_sales() {
        let result = bounded(0, 10, 10).apply(1);
        assert_eq!(result.counters.sales, 1);
        assert_eq!(result.counters.stock, 9);
        assert_eq!(result.applied, 1);
        assert!(!result.saturated);
    }

    #[test]
    fn oversell_saturates_stock_at_zero() {
        let result = bounded(5, 0, 5).apply(1);
        assert_eq!(result.counters.stock, 0);
        assert_eq!(result.counters.sales, 6);
        assert!(result.saturated);
    }

    #[test]
    fn refund_never_drives_sales_negative() {
        let result = bounded(3, 7, 10).apply(-5);
        assert_eq!(result.counters.sales, 0);
        assert_eq!(result.applied, -3);
        assert_eq!(result.counters.stock, 10);
        assert!(result.saturated);
    }

    #[test]
    fn restored_stock_is_capped_by_capacity() {
        // estoque já "cheio" por uma edição de capacidade anterior
        let result = bounded(4, 9, 10).apply(-4);
        assert_eq!(result.counters.stock, 10);
        assert_eq!(result.counters.sales, 0);
    }

    #[test]
    fn unlimited_records_sales_without_touching_stock() {
        let unlimited = StockCounters { sales: 2, stock: 0, capacity: Some(-1), managed: false };
        let result = unlimited.apply(3);
        assert_eq!(result.counters.sales, 5);
        assert_eq!(result.counters.stock, 0);
        assert!(!result.saturated);
        assert!(unlimited.admits(1_000));
    }
}
