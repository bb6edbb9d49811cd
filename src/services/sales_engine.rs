// src/services/sales_engine.rs
//
// Única porta legal para mudar vendas e estoque. O cálculo em si roda no
// store (um statement relativo à linha atual); aqui ficam os contratos.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TicketStore,
    models::{
        stock::{AdjustmentOutcome, AdjustmentRequest, ClaimOutcome, SalesAdjustment},
        ticket::TicketProvider,
    },
    services::{
        status_options::StatusOptions,
        ticket_cache::{CacheSignal, TicketCache},
    },
};

/// Resultado da reconciliação por troca de status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum StatusReconciliation {
    /// Delta zero: nada gravado, nada invalidado.
    Unchanged,
    Adjusted(SalesAdjustment),
    /// Só na variante estrita: o aumento não cabe no estoque.
    Rejected { available: i64 },
    NotFound,
}

#[derive(Clone)]
pub struct SalesEngine {
    tickets: Arc<dyn TicketStore>,
    cache: Arc<dyn TicketCache>,
    options: Arc<StatusOptions>,
}

impl SalesEngine {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        cache: Arc<dyn TicketCache>,
        options: Arc<StatusOptions>,
    ) -> Self {
        Self {
            tickets,
            cache,
            options,
        }
    }

    pub fn status_options(&self) -> &StatusOptions {
        &self.options
    }

    async fn run(
        &self,
        ticket_id: Uuid,
        request: AdjustmentRequest,
    ) -> Result<AdjustmentOutcome, AppError> {
        let outcome = self.tickets.adjust_sales(ticket_id, request).await?;

        if let AdjustmentOutcome::Applied(adjustment) = &outcome {
            // Invalida antes de devolver: a próxima leitura já reconstrói
            self.cache.signal(ticket_id, CacheSignal::MetaUpdated);
            if adjustment.saturated {
                tracing::info!(
                    %ticket_id,
                    delta = request.delta,
                    sales = adjustment.sales,
                    stock = adjustment.stock,
                    "ajuste saturado"
                );
            }
        }
        Ok(outcome)
    }

    /// Ajuste com saturação: nunca falha por falta de estoque.
    /// `None` quando o ingresso não existe.
    pub async fn adjust_sales(
        &self,
        ticket_id: Uuid,
        delta: i64,
    ) -> Result<Option<SalesAdjustment>, AppError> {
        match self.run(ticket_id, AdjustmentRequest::saturating(delta)).await? {
            AdjustmentOutcome::Applied(adjustment) => Ok(Some(adjustment)),
            AdjustmentOutcome::NotFound | AdjustmentOutcome::Rejected { .. } => Ok(None),
        }
    }

    pub async fn increase_ticket_sales_by(
        &self,
        ticket_id: Uuid,
        quantity: i64,
    ) -> Result<Option<SalesAdjustment>, AppError> {
        self.adjust_sales(ticket_id, quantity).await
    }

    pub async fn decrease_ticket_sales_by(
        &self,
        ticket_id: Uuid,
        quantity: i64,
    ) -> Result<Option<SalesAdjustment>, AppError> {
        self.adjust_sales(ticket_id, -quantity).await
    }

    /// Venda com controle de admissão: o banco só aplica se houver estoque.
    pub async fn claim(&self, ticket_id: Uuid, quantity: i64) -> Result<ClaimOutcome, AppError> {
        if quantity <= 0 {
            return Err(AppError::InvalidFieldValue {
                field: "quantity".into(),
                reason: "precisa ser maior que zero".into(),
            });
        }

        Ok(match self.run(ticket_id, AdjustmentRequest::guarded(quantity)).await? {
            AdjustmentOutcome::Applied(adjustment) => ClaimOutcome::Sold(adjustment),
            AdjustmentOutcome::Rejected { available } => {
                tracing::debug!(%ticket_id, quantity, available, "venda recusada: estoque insuficiente");
                ClaimOutcome::Insufficient { available }
            }
            AdjustmentOutcome::NotFound => ClaimOutcome::NotFound,
        })
    }

    /// Reconciliação por troca de status (saturante).
    pub async fn update_sales_and_stock_by_order_status(
        &self,
        ticket_id: Uuid,
        provider: TicketProvider,
        old_status: &str,
        new_status: &str,
        quantity: i64,
    ) -> Result<StatusReconciliation, AppError> {
        self.reconcile(ticket_id, provider, old_status, new_status, quantity, false)
            .await
    }

    /// Igual, mas um aumento de vendas passa pela guarda de admissão.
    pub async fn reconcile_status_strict(
        &self,
        ticket_id: Uuid,
        provider: TicketProvider,
        old_status: &str,
        new_status: &str,
        quantity: i64,
    ) -> Result<StatusReconciliation, AppError> {
        self.reconcile(ticket_id, provider, old_status, new_status, quantity, true)
            .await
    }

    async fn reconcile(
        &self,
        ticket_id: Uuid,
        provider: TicketProvider,
        old_status: &str,
        new_status: &str,
        quantity: i64,
        strict: bool,
    ) -> Result<StatusReconciliation, AppError> {
        let delta = self.options.delta(provider, old_status, new_status, quantity);
        if delta == 0 {
            return Ok(StatusReconciliation::Unchanged);
        }

        let request = if strict && delta > 0 {
            AdjustmentRequest::guarded(delta)
        } else {
            AdjustmentRequest::saturating(delta)
        };

        Ok(match self.run(ticket_id, request).await? {
            AdjustmentOutcome::Applied(adjustment) => StatusReconciliation::Adjusted(adjustment),
            AdjustmentOutcome::Rejected { available } => StatusReconciliation::Rejected { available },
            AdjustmentOutcome::NotFound => StatusReconciliation::NotFound,
        })
    }
}
