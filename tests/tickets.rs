//! Leitura pelo cache, edição, duplicação e consultas de ingressos.

mod common;

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use event_tickets::{
    common::{error::AppError, hooks::{Hooks, DEFAULT_PRIORITY}},
    models::{
        event::EventFlags,
        query::{CostFilter, CostOperator, ResolvedTicketQuery, TicketQuery},
        stock::{AdjustmentOutcome, AdjustmentRequest, Availability},
        ticket::{NewTicket, TicketChanges, TicketProvider, TicketRecord},
    },
    db::{EventStore, MemoryStore, Stores, TicketStore},
    services::{CacheSignal, MemoryTicketCache, StaticCapabilities, TicketCache, TicketService},
};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use common::{app, app_with, build, draft, event, global, own, ticket, ticket_for};

fn price(raw: &str) -> Decimal {
    raw.parse().unwrap()
}

#[tokio::test]
async fn saving_invalidates_but_renaming_the_event_does_not() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;

    app.tickets.get_ticket(id).await.unwrap();
    assert!(app.cache.get(id).is_some());

    app.provider
        .rename_event(event_id, "Festival de Verão", None)
        .await
        .unwrap()
        .unwrap();
    assert!(app.cache.get(id).is_some());

    app.tickets.edit(id).name("Geral - Lote 2").commit().await.unwrap();
    assert!(app.cache.get(id).is_none());

    let ticket = app.tickets.get_ticket(id).await.unwrap().unwrap();
    assert_eq!(ticket.name, "Geral - Lote 2");
}

#[tokio::test]
async fn listing_does_not_fill_the_cache() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;

    let listed = app.tickets.list(TicketQuery::for_event(event_id)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(app.cache.get(id).is_none());
}

// ---
// Store que registra uma venda entre a leitura do banco e a volta ao serviço
// ---

struct SaleDuringRead {
    inner: MemoryStore,
    cache: Arc<MemoryTicketCache>,
    fired: AtomicBool,
}

#[async_trait]
impl TicketStore for SaleDuringRead {
    async fn find_ticket(&self, id: Uuid) -> Result<Option<TicketRecord>, AppError> {
        let read = self.inner.find_ticket(id).await?;
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.inner.adjust_sales(id, AdjustmentRequest::saturating(1)).await?;
            self.cache.signal(id, CacheSignal::MetaUpdated);
        }
        Ok(read)
    }

    async fn insert_ticket(&self, ticket: &NewTicket) -> Result<TicketRecord, AppError> {
        self.inner.insert_ticket(ticket).await
    }

    async fn update_ticket(
        &self,
        id: Uuid,
        changes: &TicketChanges,
    ) -> Result<Option<TicketRecord>, AppError> {
        self.inner.update_ticket(id, changes).await
    }

    async fn soft_delete_ticket(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.soft_delete_ticket(id).await
    }

    async fn list_tickets(&self, query: &ResolvedTicketQuery) -> Result<Vec<TicketRecord>, AppError> {
        self.inner.list_tickets(query).await
    }

    async fn adjust_sales(
        &self,
        id: Uuid,
        request: AdjustmentRequest,
    ) -> Result<AdjustmentOutcome, AppError> {
        self.inner.adjust_sales(id, request).await
    }
}

#[tokio::test]
async fn a_read_overtaken_by_a_sale_is_not_cached() {
    let store = MemoryStore::new();
    let app = build(
        Stores::from_memory(store.clone()),
        Hooks::new(),
        Arc::new(StaticCapabilities::allow_all()),
    );
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;

    let cache = Arc::new(MemoryTicketCache::new());
    let racing = Arc::new(SaleDuringRead {
        inner: store.clone(),
        cache: cache.clone(),
        fired: AtomicBool::new(false),
    });
    let service = TicketService::new(racing, Arc::new(store), cache.clone(), Arc::new(Hooks::new()));

    let stale = service.get_snapshot(id).await.unwrap().unwrap();
    assert_eq!(stale.sales, 0);
    assert!(!cache.contains(id));

    let fresh = service.get_snapshot(id).await.unwrap().unwrap();
    assert_eq!(fresh.sales, 1);
    assert_eq!(cache.get(id).map(|s| s.sales), Some(1));
}

#[tokio::test]
async fn editor_writes_everything_in_one_save() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;
    app.sales.increase_ticket_sales_by(id, 4).await.unwrap();

    let ticket = app
        .tickets
        .edit(id)
        .set("_price", json!("30.50"))
        .unwrap()
        .set("_capacity", json!(20))
        .unwrap()
        .menu_order(2)
        .commit()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(ticket.price, price("30.50"));
    assert_eq!(ticket.capacity, Some(20));
    assert_eq!(ticket.menu_order, 2);
    // estoque recalculado a partir das vendas
    assert_eq!((ticket.sales, ticket.stock), (4, 16));

    let unlimited = app.tickets.edit(id).capacity(-1).commit().await.unwrap().unwrap();
    assert!(!unlimited.manage_stock);
    assert_eq!(unlimited.available, Availability::Unlimited);
}

#[tokio::test]
async fn editor_refuses_engine_owned_fields() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;

    for key in ["total_sales", "_stock"] {
        let result = app.tickets.edit(id).set(key, json!(3));
        assert!(matches!(result, Err(AppError::ProtectedField(_))));
    }
    assert!(matches!(
        app.tickets.edit(id).set("_nope", json!(1)),
        Err(AppError::UnknownField(_))
    ));
}

#[tokio::test]
async fn fields_are_read_by_durable_key() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;

    assert_eq!(app.tickets.get_field(id, "_capacity").await.unwrap(), Some(json!(10)));
    assert_eq!(app.tickets.get_field(id, "_name").await.unwrap(), Some(json!("Geral")));
    assert_eq!(app.tickets.get_field(Uuid::new_v4(), "_name").await.unwrap(), None);
    assert!(app.tickets.get_field(id, "whatever").await.is_err());
}

#[tokio::test]
async fn duplicate_copies_settings_with_fresh_inventory() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;
    app.sales.increase_ticket_sales_by(id, 6).await.unwrap();

    let copy = app.tickets.duplicate(id).await.unwrap().unwrap();
    assert_ne!(copy.id, id);
    assert_eq!(copy.name, "Geral");
    assert_eq!(copy.capacity, Some(10));
    assert_eq!((copy.sales, copy.stock), (0, 10));
    assert!(app.tickets.duplicate(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn event_remap_runs_once_per_query() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut hooks = Hooks::new();
    hooks.ticket_event_ids.add(DEFAULT_PRIORITY, move |ids| {
        counter.fetch_add(1, Ordering::SeqCst);
        ids
    });
    let app = app_with(hooks);
    let event_id = event(&app).await;
    ticket(&app, event_id, "Geral", own(10)).await;
    ticket(&app, event_id, "Meia", own(10)).await;
    calls.store(0, Ordering::SeqCst);

    let tickets = app.tickets.list(TicketQuery::for_event(event_id)).await.unwrap();
    assert_eq!(tickets.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn remap_to_nothing_returns_an_empty_list() {
    let mut hooks = Hooks::new();
    hooks.ticket_event_ids.add(DEFAULT_PRIORITY, |_| Vec::new());
    let app = app_with(hooks);
    let event_id = event(&app).await;
    ticket(&app, event_id, "Geral", own(10)).await;

    assert!(app.tickets.list(TicketQuery::for_event(event_id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn remap_can_pull_tickets_from_a_series_parent() {
    let memory = MemoryStore::new();
    let parent = memory.insert_event("Temporada", None).await.unwrap().id;
    let occurrence = memory.insert_event("Sessão de sábado", None).await.unwrap().id;

    let mut hooks = Hooks::new();
    hooks.ticket_event_ids.add(DEFAULT_PRIORITY, move |ids: Vec<Uuid>| {
        ids.into_iter()
            .map(|id| if id == occurrence { parent } else { id })
            .collect()
    });
    let app = build(
        Stores::from_memory(memory),
        hooks,
        Arc::new(StaticCapabilities::allow_all()),
    );
    let pass = ticket(&app, parent, "Passaporte", own(10)).await;

    let tickets = app.tickets.list(TicketQuery::for_event(occurrence)).await.unwrap();
    assert_eq!(tickets.iter().map(|t| t.id).collect::<Vec<_>>(), [pass]);
}

#[tokio::test]
async fn cost_and_currency_filters() {
    let app = app();
    let event_id = event(&app).await;

    let mut cheap = draft("Meia", TicketProvider::Commerce);
    cheap.price = price("10");
    let mut pricey = draft("Inteira", TicketProvider::Commerce);
    pricey.price = price("40");
    pricey.currency_code = Some("eur".into());
    let mut rsvp = draft("Convite", TicketProvider::Rsvp);
    rsvp.price = price("99");
    ticket_for(&app, event_id, cheap, own(10)).await;
    ticket_for(&app, event_id, pricey, own(10)).await;
    ticket_for(&app, event_id, rsvp, own(10)).await;

    let names = |tickets: Vec<event_tickets::models::ticket::Ticket>| {
        let mut names: Vec<String> = tickets.into_iter().map(|t| t.name).collect();
        names.sort();
        names
    };

    let under_20 = TicketQuery::for_event(event_id).cost(CostFilter::new(CostOperator::Lt, price("20")));
    assert_eq!(names(app.tickets.list(under_20).await.unwrap()), ["Convite", "Meia"]);

    let between = TicketQuery::for_event(event_id).cost(CostFilter::between(price("50"), price("5")));
    assert_eq!(names(app.tickets.list(between).await.unwrap()), ["Inteira", "Meia"]);

    // código ou símbolo levam ao mesmo resultado
    let by_code = TicketQuery::for_event(event_id).currency("EUR");
    let by_symbol = TicketQuery::for_event(event_id).currency("€");
    assert_eq!(names(app.tickets.list(by_code).await.unwrap()), ["Inteira"]);
    assert_eq!(names(app.tickets.list(by_symbol).await.unwrap()), ["Inteira"]);

    // mesmo símbolo, outra moeda
    let mut canadian = draft("Canadense", TicketProvider::Commerce);
    canadian.currency_code = Some("CAD".into());
    ticket_for(&app, event_id, canadian, own(10)).await;
    let usd = TicketQuery::for_event(event_id).currency("USD");
    assert_eq!(names(app.tickets.list(usd).await.unwrap()), ["Convite", "Meia"]);
    let cad = TicketQuery::for_event(event_id).currency("cad");
    assert_eq!(names(app.tickets.list(cad).await.unwrap()), ["Canadense"]);

    let rsvps = TicketQuery::for_event(event_id).provider(TicketProvider::Rsvp);
    assert_eq!(names(app.tickets.list(rsvps).await.unwrap()), ["Convite"]);
}

#[tokio::test]
async fn attendee_filters_find_the_ticket_they_hold() {
    let app = app();
    let event_id = event(&app).await;
    let held = ticket(&app, event_id, "Geral", own(10)).await;
    ticket(&app, event_id, "Meia", own(10)).await;

    let user = Uuid::new_v4();
    let data = event_tickets::models::attendee::AttendeeData {
        user_id: Some(user),
        ..common::holder("Ana")
    };
    let attendee = app
        .provider
        .generate_attendees_for(held, 1, data)
        .await
        .unwrap()
        .unwrap()[0];

    let by_attendee = app
        .tickets
        .list(TicketQuery::for_event(event_id).attendee(attendee))
        .await
        .unwrap();
    let by_user = app
        .tickets
        .list(TicketQuery::for_event(event_id).attendee_user(user))
        .await
        .unwrap();
    assert_eq!(by_attendee.iter().map(|t| t.id).collect::<Vec<_>>(), [held]);
    assert_eq!(by_user.iter().map(|t| t.id).collect::<Vec<_>>(), [held]);
}

#[tokio::test]
async fn events_filter_by_what_they_have() {
    let mut hooks = Hooks::new();
    let injected = Uuid::new_v4();
    hooks
        .events_with_injected_attendees
        .add(DEFAULT_PRIORITY, move |mut ids| {
            ids.push(injected);
            ids
        });
    let app = app_with(hooks);
    let with_tickets = event(&app).await;
    let with_rsvp = event(&app).await;
    let empty = event(&app).await;
    ticket(&app, with_tickets, "Geral", global(10)).await;
    ticket_for(&app, with_rsvp, draft("Convite", TicketProvider::Rsvp), own(10)).await;

    let all = [with_tickets, with_rsvp, empty];
    let tickets = EventFlags {
        has_tickets: Some(true),
        ..Default::default()
    };
    let no_rsvp = EventFlags {
        has_rsvp: Some(false),
        ..Default::default()
    };
    assert_eq!(app.tickets.events_with(&all, tickets).await.unwrap(), [with_tickets]);
    assert_eq!(
        app.tickets.events_with(&all, no_rsvp).await.unwrap(),
        [with_tickets, empty]
    );
    assert!(app.tickets.events_with(&[], tickets).await.unwrap().is_empty());

    let attendees = EventFlags {
        has_attendees: Some(true),
        ..Default::default()
    };
    assert_eq!(
        app.tickets.events_with(&[empty, injected], attendees).await.unwrap(),
        [injected]
    );
}
