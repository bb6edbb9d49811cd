//! Participantes: geração com reserva de estoque, status, check-in e remoção.

mod common;

use std::sync::{Arc, Mutex};

use event_tickets::{
    common::{
        error::AppError,
        hooks::{Hooks, RawStatusOption, DEFAULT_PRIORITY},
    },
    config::{AppState, Settings},
    db::{MemoryStore, Stores},
    models::{
        attendee::{ActivityLogEntry, AttendeeData, AttendeeScope, CheckinSource},
        stock::Availability,
        ticket::TicketProvider,
    },
    services::{
        provider_service::MAX_ATTENDEES_PER_REQUEST, sales_engine::StatusReconciliation,
        StaticCapabilities,
    },
};
use serde_json::json;
use uuid::Uuid;

use common::{app, app_with, build, draft, event, holder, own, ticket, ticket_for, FailingAttendees};

#[tokio::test]
async fn generating_attendees_claims_stock_first() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;

    let ids = app
        .provider
        .generate_attendees_for(id, 3, holder("Ana"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ids.len(), 3);

    let ticket = app.tickets.get_ticket(id).await.unwrap().unwrap();
    assert_eq!((ticket.sales, ticket.stock), (3, 7));

    let attendees = app.attendees.list(AttendeeScope::Ticket(id)).await.unwrap();
    assert_eq!(attendees.len(), 3);
    assert!(attendees.iter().all(|a| a.status == "completed"));
    // códigos de segurança distintos
    let mut codes: Vec<_> = attendees.iter().map(|a| a.security_code.clone()).collect();
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), 3);
}

#[tokio::test]
async fn failed_sale_creates_no_attendee() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(2)).await;

    let outcome = app
        .provider
        .generate_attendees_for(id, 3, holder("Ana"))
        .await
        .unwrap();
    assert!(outcome.is_none());

    assert!(app.attendees.list(AttendeeScope::Ticket(id)).await.unwrap().is_empty());
    let ticket = app.tickets.get_ticket(id).await.unwrap().unwrap();
    assert_eq!((ticket.sales, ticket.stock), (0, 2));
}

#[tokio::test]
async fn insert_failure_gives_the_stock_back() {
    let memory = MemoryStore::new();
    let stores = Stores {
        tickets: Arc::new(memory.clone()),
        events: Arc::new(memory.clone()),
        attendees: Arc::new(FailingAttendees::new(memory)),
    };
    let app = build(stores, Hooks::new(), Arc::new(StaticCapabilities::allow_all()));
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;

    let result = app.provider.generate_attendees_for(id, 2, holder("Ana")).await;
    assert!(result.is_err());

    let ticket = app.tickets.get_ticket(id).await.unwrap().unwrap();
    assert_eq!((ticket.sales, ticket.stock), (0, 10));
}

#[tokio::test]
async fn zero_quantity_and_bad_input() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;

    assert_eq!(
        app.provider.generate_attendees_for(id, 0, holder("Ana")).await.unwrap(),
        Some(Vec::new())
    );
    assert!(app.provider.generate_attendees_for(id, -1, holder("Ana")).await.is_err());
    assert!(
        app.provider
            .generate_attendees_for(Uuid::new_v4(), 1, holder("Ana"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn oversized_requests_are_refused_before_touching_stock() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(-1)).await;

    let result = app
        .provider
        .generate_attendees_for(id, MAX_ATTENDEES_PER_REQUEST + 1, holder("Ana"))
        .await;
    assert!(matches!(result, Err(AppError::InvalidFieldValue { .. })));

    let ticket = app.tickets.get_ticket(id).await.unwrap().unwrap();
    assert_eq!(ticket.sales, 0);
    assert!(app.attendees.list(AttendeeScope::Ticket(id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn status_weight_times_quantity_cannot_overflow() {
    let settings = Settings {
        rsvp_status_options: vec![RawStatusOption::new("vip", i64::MAX)],
        ..Settings::default()
    };
    let app = AppState::with_capabilities(
        &settings,
        Stores::in_memory(),
        Hooks::new(),
        Arc::new(StaticCapabilities::allow_all()),
    );
    let event_id = event(&app).await;
    let id = ticket_for(&app, event_id, draft("Convite", TicketProvider::Rsvp), own(-1)).await;

    let mut data = holder("Ana");
    data.status = Some("vip".into());
    let result = app.provider.generate_attendees_for(id, 2, data).await;
    assert!(matches!(result, Err(AppError::InvalidFieldValue { .. })));

    let ticket = app.tickets.get_ticket(id).await.unwrap().unwrap();
    assert_eq!(ticket.sales, 0);
}

#[tokio::test]
async fn closed_sale_window_refuses_attendees() {
    let app = app();
    let event_id = event(&app).await;
    let mut closed = draft("Pré-venda", TicketProvider::Commerce);
    closed.end_date = Some(chrono::Utc::now() - chrono::Duration::days(1));
    let id = ticket_for(&app, event_id, closed, own(10)).await;

    assert!(
        app.provider
            .generate_attendees_for(id, 1, holder("Ana"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn rsvp_no_does_not_consume_stock() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket_for(&app, event_id, draft("RSVP", TicketProvider::Rsvp), own(5)).await;

    let declined = AttendeeData {
        status: Some("no".into()),
        ..holder("Bia")
    };
    app.provider
        .generate_attendees_for(id, 1, declined)
        .await
        .unwrap()
        .unwrap();

    let ticket = app.tickets.get_ticket(id).await.unwrap().unwrap();
    assert_eq!(ticket.available, Availability::Limited(5));
    assert_eq!(ticket.price, rust_decimal::Decimal::ZERO);
}

#[tokio::test]
async fn status_change_reconciles_and_no_op_is_unchanged() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket_for(&app, event_id, draft("RSVP", TicketProvider::Rsvp), own(5)).await;
    let attendee = app
        .provider
        .generate_attendees_for(id, 1, holder("Bia"))
        .await
        .unwrap()
        .unwrap()[0];

    let same = app
        .provider
        .change_attendee_status(attendee, "yes", None)
        .await
        .unwrap();
    assert_eq!(same, Some(StatusReconciliation::Unchanged));

    let declined = app
        .provider
        .change_attendee_status(attendee, "no", None)
        .await
        .unwrap();
    assert!(matches!(declined, Some(StatusReconciliation::Adjusted(_))));

    let attendee = app.attendees.find(attendee).await.unwrap().unwrap();
    assert_eq!(attendee.status, "no");
    let ticket = app.tickets.get_ticket(id).await.unwrap().unwrap();
    assert_eq!((ticket.sales, ticket.stock), (0, 5));
}

#[tokio::test]
async fn rejected_status_change_keeps_the_old_status() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket_for(&app, event_id, draft("RSVP", TicketProvider::Rsvp), own(1)).await;
    let declined = AttendeeData {
        status: Some("no".into()),
        ..holder("Bia")
    };
    let late = app
        .provider
        .generate_attendees_for(id, 1, declined)
        .await
        .unwrap()
        .unwrap()[0];
    app.provider
        .generate_attendees_for(id, 1, holder("Caio"))
        .await
        .unwrap()
        .unwrap();

    let outcome = app
        .provider
        .change_attendee_status(late, "yes", None)
        .await
        .unwrap();
    assert_eq!(outcome, Some(StatusReconciliation::Rejected { available: 0 }));
    assert_eq!(app.attendees.find(late).await.unwrap().unwrap().status, "no");
}

#[tokio::test]
async fn deleting_a_ticket_keeps_its_name_on_the_attendees() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "VIP Ticket", own(10)).await;
    app.provider
        .generate_attendees_for(id, 2, holder("Ana"))
        .await
        .unwrap()
        .unwrap();

    // pelo evento errado nada acontece
    assert!(!app.provider.delete_ticket(Uuid::new_v4(), id, None).await.unwrap());
    assert!(app.provider.delete_ticket(event_id, id, None).await.unwrap());

    assert!(app.tickets.get_ticket(id).await.unwrap().is_none());
    let attendees = app.attendees.list(AttendeeScope::Ticket(id)).await.unwrap();
    assert_eq!(attendees.len(), 2);
    assert!(
        attendees
            .iter()
            .all(|a| a.deleted_product_name.as_deref() == Some("VIP Ticket"))
    );
}

#[tokio::test]
async fn deleting_an_attendee_returns_its_unit() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;
    let ids = app
        .provider
        .generate_attendees_for(id, 2, holder("Ana"))
        .await
        .unwrap()
        .unwrap();

    assert!(app.provider.delete_attendee(ids[0], None).await.unwrap());
    assert!(!app.provider.delete_attendee(ids[0], None).await.unwrap());

    let ticket = app.tickets.get_ticket(id).await.unwrap().unwrap();
    assert_eq!((ticket.sales, ticket.stock), (1, 9));
}

#[tokio::test]
async fn checkin_and_uncheckin_move_all_fields_together() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;
    let attendee = app
        .provider
        .generate_attendees_for(id, 1, holder("Ana"))
        .await
        .unwrap()
        .unwrap()[0];
    let staff = Uuid::new_v4();

    assert!(app.checkin.checkin(attendee, true, Some(staff)).await.unwrap());
    let checked = app.attendees.find(attendee).await.unwrap().unwrap();
    assert!(checked.checked_in);
    assert_eq!(checked.qr_status, Some(true));
    let details = checked.checkin_details.unwrap();
    assert_eq!(details.source, CheckinSource::App);
    assert_eq!(details.author, Some(staff));

    assert!(app.checkin.uncheckin(attendee, Some(staff)).await.unwrap());
    let reverted = app.attendees.find(attendee).await.unwrap().unwrap();
    assert!(!reverted.checked_in);
    assert!(reverted.checkin_details.is_none());
    assert!(reverted.qr_status.is_none());

    assert!(!app.checkin.checkin(Uuid::new_v4(), false, None).await.unwrap());
}

#[tokio::test]
async fn saving_a_ticket_needs_permission_on_the_event() {
    let memory = MemoryStore::new();
    let app = build(
        Stores::from_memory(memory),
        Hooks::new(),
        Arc::new(StaticCapabilities::deny_all()),
    );
    let event_id = app.provider.create_event("Show", None).await.unwrap().id;
    assert!(
        app.provider
            .save_ticket(event_id, draft("Geral", TicketProvider::Commerce), own(5), None)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn ticket_sent_counter_starts_from_zero() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;
    let attendee = app
        .provider
        .generate_attendees_for(id, 1, holder("Ana"))
        .await
        .unwrap()
        .unwrap()[0];

    assert_eq!(app.checkin.update_ticket_sent_counter(attendee).await.unwrap(), Some(1));
    assert_eq!(app.checkin.update_ticket_sent_counter(attendee).await.unwrap(), Some(2));
    assert_eq!(
        app.attendees
            .get_field(attendee, "_tribe_attendee_ticket_sent")
            .await
            .unwrap(),
        Some(json!(2))
    );
    assert_eq!(
        app.checkin.update_ticket_sent_counter(Uuid::new_v4()).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn activity_log_appends_in_order_through_the_filter() {
    let mut hooks = Hooks::new();
    hooks.attendee_activity_entry.add(DEFAULT_PRIORITY, |mut entry: ActivityLogEntry| {
        entry.message = entry.message.to_uppercase();
        entry
    });
    let app = app_with(hooks);
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;
    let attendee = app
        .provider
        .generate_attendees_for(id, 1, holder("Ana"))
        .await
        .unwrap()
        .unwrap()[0];

    for message in ["primeiro", "segundo"] {
        let entry = ActivityLogEntry::new("email", message, None);
        assert!(app.checkin.update_attendee_activity_log(attendee, entry).await.unwrap());
    }

    let log = app.attendees.find(attendee).await.unwrap().unwrap().activity_log;
    let messages: Vec<_> = log.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, ["PRIMEIRO", "SEGUNDO"]);
}

#[tokio::test]
async fn notices_follow_the_ticket_lifecycle() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut hooks = Hooks::new();
    hooks.notices.add(DEFAULT_PRIORITY, move |notice| {
        sink.lock().unwrap().push(notice.name());
    });
    let app = app_with(hooks);
    let event_id = event(&app).await;
    let id = ticket(&app, event_id, "Geral", own(10)).await;
    let attendee = app
        .provider
        .generate_attendees_for(id, 1, holder("Ana"))
        .await
        .unwrap()
        .unwrap()[0];
    app.checkin.checkin(attendee, false, None).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        [
            "before_ticket_create",
            "ticket_created",
            "after_ticket_save",
            "attendee_created",
            "checkin",
        ]
    );
}

#[tokio::test]
async fn status_counts_group_by_status() {
    let app = app();
    let event_id = event(&app).await;
    let id = ticket_for(&app, event_id, draft("RSVP", TicketProvider::Rsvp), own(10)).await;
    app.provider.generate_attendees_for(id, 2, holder("Ana")).await.unwrap();
    let declined = AttendeeData {
        status: Some("no".into()),
        ..holder("Bia")
    };
    app.provider.generate_attendees_for(id, 1, declined).await.unwrap();

    let counts = app.attendees.status_counts(AttendeeScope::Event(event_id)).await.unwrap();
    let pairs: Vec<_> = counts.iter().map(|c| (c.status.as_str(), c.total)).collect();
    assert_eq!(pairs, [("no", 1), ("yes", 2)]);
}
