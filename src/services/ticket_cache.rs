// src/services/ticket_cache.rs

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use uuid::Uuid;

use crate::models::ticket::TicketSnapshot;

/// Sinais emitidos pelas operações de escrita do repositório.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSignal {
    MetaAdded,
    MetaUpdated,
    MetaDeleted,
    Saved,
    Trashed,
    Deleted,
    Flush,
    /// O evento dono do ingresso mudou. Não invalida.
    ParentUpdated(Uuid),
}

impl CacheSignal {
    pub fn invalidates(&self) -> bool {
        !matches!(self, CacheSignal::ParentUpdated(_))
    }
}

/// Marca de leitura: quantas invalidações a entrada (e o cache todo) já recebeu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheVersion {
    flushes: u64,
    invalidations: u64,
}

pub trait TicketCache: Send + Sync {
    fn get(&self, ticket_id: Uuid) -> Option<TicketSnapshot>;

    /// Lida antes de ir ao banco, repassada ao `set`.
    fn version(&self, ticket_id: Uuid) -> CacheVersion;

    /// Grava só se nada invalidou a entrada desde `version`. Devolve se gravou.
    fn set(&self, snapshot: &TicketSnapshot, version: CacheVersion) -> bool;

    fn invalidate(&self, ticket_id: Uuid);

    /// Esvazia o cache inteiro.
    fn flush(&self);

    /// Aplica a regra de invalidação. Devolve `true` se a entrada foi descartada.
    fn signal(&self, ticket_id: Uuid, signal: CacheSignal) -> bool {
        if !signal.invalidates() {
            return false;
        }
        match signal {
            CacheSignal::Flush => self.flush(),
            _ => self.invalidate(ticket_id),
        }
        tracing::debug!(%ticket_id, ?signal, "cache do ingresso invalidado");
        true
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<Uuid, String>,
    invalidations: HashMap<Uuid, u64>,
    flushes: u64,
}

impl CacheState {
    fn version(&self, ticket_id: Uuid) -> CacheVersion {
        CacheVersion {
            flushes: self.flushes,
            invalidations: self.invalidations.get(&ticket_id).copied().unwrap_or(0),
        }
    }
}

/// Cache em processo. Guarda o snapshot serializado: só campos primitivos.
#[derive(Debug, Default)]
pub struct MemoryTicketCache {
    state: RwLock<CacheState>,
}

impl MemoryTicketCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, ticket_id: Uuid) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .contains_key(&ticket_id)
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TicketCache for MemoryTicketCache {
    fn get(&self, ticket_id: Uuid) -> Option<TicketSnapshot> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let raw = state.entries.get(&ticket_id)?;
        match serde_json::from_str(raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(%ticket_id, "entrada de cache ilegível, ignorando: {}", e);
                None
            }
        }
    }

    fn version(&self, ticket_id: Uuid) -> CacheVersion {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .version(ticket_id)
    }

    fn set(&self, snapshot: &TicketSnapshot, version: CacheVersion) -> bool {
        let raw = match serde_json::to_string(snapshot) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(ticket_id = %snapshot.id, "snapshot não serializável: {}", e);
                return false;
            }
        };

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        // Uma escrita invalidou a entrada enquanto o banco era lido: o snapshot já nasceu velho
        if state.version(snapshot.id) != version {
            tracing::debug!(ticket_id = %snapshot.id, "snapshot descartado: entrada invalidada durante a leitura");
            return false;
        }
        state.entries.insert(snapshot.id, raw);
        true
    }

    fn invalidate(&self, ticket_id: Uuid) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.entries.remove(&ticket_id);
        *state.invalidations.entry(ticket_id).or_default() += 1;
    }

    fn flush(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.entries.clear();
        state.invalidations.clear();
        state.flushes += 1;
    }
}
