// src/routes.rs

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::{config::AppState, handlers};

pub fn router(app_state: AppState) -> Router {
    let event_routes = Router::new()
        .route(
            "/",
            get(handlers::events::filter_events).post(handlers::events::create_event),
        )
        .route("/{event_id}", put(handlers::events::rename_event))
        .route(
            "/{event_id}/shared-stock",
            put(handlers::events::configure_shared_stock),
        )
        .route("/{event_id}/counts", get(handlers::events::ticket_counts))
        .route("/{event_id}/attendees", get(handlers::events::list_attendees))
        .route(
            "/{event_id}/attendees/status-counts",
            get(handlers::events::attendee_status_counts),
        )
        .route(
            "/{event_id}/tickets",
            get(handlers::tickets::list_tickets).post(handlers::tickets::save_ticket),
        )
        .route(
            "/{event_id}/tickets/{ticket_id}",
            axum::routing::delete(handlers::tickets::delete_ticket),
        );

    let ticket_routes = Router::new()
        .route("/{ticket_id}", get(handlers::tickets::get_ticket))
        .route(
            "/{ticket_id}/fields",
            patch(handlers::tickets::update_ticket_fields),
        )
        .route(
            "/{ticket_id}/fields/{key}",
            get(handlers::tickets::get_ticket_field),
        )
        .route(
            "/{ticket_id}/duplicate",
            post(handlers::tickets::duplicate_ticket),
        )
        .route("/{ticket_id}/sales", post(handlers::tickets::adjust_sales))
        .route("/{ticket_id}/claims", post(handlers::tickets::claim_ticket))
        .route(
            "/{ticket_id}/attendees",
            post(handlers::tickets::generate_attendees),
        );

    let attendee_routes = Router::new()
        .route(
            "/{attendee_id}",
            get(handlers::attendees::get_attendee).delete(handlers::attendees::delete_attendee),
        )
        .route(
            "/{attendee_id}/fields/{key}",
            get(handlers::attendees::get_attendee_field),
        )
        .route("/{attendee_id}/status", put(handlers::attendees::change_status))
        .route(
            "/{attendee_id}/checkin",
            post(handlers::attendees::checkin).delete(handlers::attendees::uncheckin),
        )
        .route(
            "/{attendee_id}/ticket-sent",
            post(handlers::attendees::mark_ticket_sent),
        )
        .route(
            "/{attendee_id}/activity",
            post(handlers::attendees::append_activity),
        );

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/status-options/{provider}",
            get(handlers::attendees::status_options),
        )
        .nest("/api/events", event_routes)
        .nest("/api/tickets", ticket_routes)
        .nest("/api/attendees", attendee_routes)
        .with_state(app_state)
}
