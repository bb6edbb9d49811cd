// src/config.rs

use std::{collections::HashSet, env, sync::Arc, time::Duration};

use anyhow::Context;
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    common::hooks::{Hooks, RawStatusOption},
    db::Stores,
    services::{
        AttendeeService, CapabilityChecker, CheckinService, EventOwnerCapabilities,
        MemoryTicketCache, ProviderService, SalesEngine, StatusOptions, TicketCache,
        TicketService,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub max_connections: u32,
    pub default_currency: String,
    /// Usuários com permissão de gerenciar qualquer evento.
    pub admin_ids: HashSet<Uuid>,
    /// Opções extras de status de RSVP (status -> peso), ainda sem poda.
    pub rsvp_status_options: Vec<RawStatusOption>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:3000".to_string(),
            max_connections: 5,
            default_currency: "USD".to_string(),
            admin_ids: HashSet::new(),
            rsvp_status_options: Vec::new(),
        }
    }
}

impl Settings {
    /// Lê o `.env` (se houver) e as variáveis de ambiente.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .context("DATABASE_MAX_CONNECTIONS deve ser um inteiro positivo")?,
            Err(_) => defaults.max_connections,
        };

        let admin_ids = match env::var("TICKETS_ADMIN_IDS") {
            Ok(raw) => parse_admin_ids(&raw)?,
            Err(_) => HashSet::new(),
        };

        let rsvp_status_options = match env::var("TICKETS_RSVP_STATUS_OPTIONS") {
            Ok(raw) => parse_status_options(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_connections,
            default_currency: env::var("TICKETS_DEFAULT_CURRENCY")
                .map(|code| code.trim().to_ascii_uppercase())
                .unwrap_or(defaults.default_currency),
            admin_ids,
            rsvp_status_options,
        })
    }

    /// Conecta ao Postgres. `DATABASE_URL` é obrigatória aqui.
    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let database_url = self
            .database_url
            .as_deref()
            .context("DATABASE_URL deve ser definida")?;

        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(pool)
    }
}

/// Lista separada por vírgulas de UUIDs.
pub fn parse_admin_ids(raw: &str) -> anyhow::Result<HashSet<Uuid>> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| Uuid::parse_str(id).with_context(|| format!("TICKETS_ADMIN_IDS: '{id}' não é um UUID")))
        .collect()
}

/// Objeto JSON `{"status": peso}`. A validação dos pesos fica para a carga das opções.
pub fn parse_status_options(raw: &str) -> anyhow::Result<Vec<RawStatusOption>> {
    let object: Map<String, Value> = serde_json::from_str(raw)
        .context("TICKETS_RSVP_STATUS_OPTIONS deve ser um objeto JSON")?;
    Ok(object
        .into_iter()
        .map(|(status, weight)| RawStatusOption::new(status, weight))
        .collect())
}

// ---
// Estado compartilhado dos handlers
// ---

#[derive(Clone)]
pub struct AppState {
    pub tickets: TicketService,
    pub attendees: AttendeeService,
    pub sales: SalesEngine,
    pub checkin: CheckinService,
    pub provider: ProviderService,
    pub cache: Arc<dyn TicketCache>,
}

impl AppState {
    /// Monta o gráfico de dependências com permissões por dono do evento.
    pub fn build(settings: &Settings, stores: Stores, hooks: Hooks) -> Self {
        let capabilities = Arc::new(EventOwnerCapabilities::new(
            stores.events.clone(),
            settings.admin_ids.clone(),
        ));
        Self::with_capabilities(settings, stores, hooks, capabilities)
    }

    pub fn with_capabilities(
        settings: &Settings,
        stores: Stores,
        hooks: Hooks,
        capabilities: Arc<dyn CapabilityChecker>,
    ) -> Self {
        let options = Arc::new(StatusOptions::load(&settings.rsvp_status_options, &hooks));
        let hooks = Arc::new(hooks);
        let cache: Arc<dyn TicketCache> = Arc::new(MemoryTicketCache::new());

        let tickets = TicketService::new(
            stores.tickets.clone(),
            stores.events.clone(),
            cache.clone(),
            hooks.clone(),
        );
        let attendees = AttendeeService::new(stores.attendees.clone());
        let sales = SalesEngine::new(stores.tickets.clone(), cache.clone(), options);
        let checkin = CheckinService::new(stores.attendees.clone(), capabilities.clone(), hooks.clone());
        let provider = ProviderService::new(
            tickets.clone(),
            attendees.clone(),
            sales.clone(),
            stores.events.clone(),
            capabilities,
            hooks,
            settings.default_currency.clone(),
        );

        Self {
            tickets,
            attendees,
            sales,
            checkin,
            provider,
            cache,
        }
    }
}
