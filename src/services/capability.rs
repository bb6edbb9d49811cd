// src/services/capability.rs

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{common::error::AppError, db::EventStore};

/// "Pode gerenciar ingressos/participantes deste evento?"
/// Negar é um resultado normal (`Ok(false)`), não um erro.
#[async_trait]
pub trait CapabilityChecker: Send + Sync {
    async fn can_manage_event(&self, actor: Option<Uuid>, event_id: Uuid) -> Result<bool, AppError>;
}

/// Dono do evento ou administrador.
#[derive(Clone)]
pub struct EventOwnerCapabilities {
    events: Arc<dyn EventStore>,
    administrators: HashSet<Uuid>,
}

impl EventOwnerCapabilities {
    pub fn new(events: Arc<dyn EventStore>, administrators: HashSet<Uuid>) -> Self {
        Self {
            events,
            administrators,
        }
    }
}

#[async_trait]
impl CapabilityChecker for EventOwnerCapabilities {
    async fn can_manage_event(&self, actor: Option<Uuid>, event_id: Uuid) -> Result<bool, AppError> {
        let Some(actor) = actor else {
            return Ok(false);
        };
        if self.administrators.contains(&actor) {
            return Ok(true);
        }

        let event = self.events.find_event(event_id).await?;
        Ok(event.is_some_and(|e| e.author_id == Some(actor)))
    }
}

/// Resposta fixa. Útil em uso embarcado e nos testes.
#[derive(Debug, Clone, Copy)]
pub struct StaticCapabilities(bool);

impl StaticCapabilities {
    pub fn allow_all() -> Self {
        Self(true)
    }

    pub fn deny_all() -> Self {
        Self(false)
    }
}

#[async_trait]
impl CapabilityChecker for StaticCapabilities {
    async fn can_manage_event(&self, _actor: Option<Uuid>, _event_id: Uuid) -> Result<bool, AppError> {
        Ok(self.0)
    }
}
