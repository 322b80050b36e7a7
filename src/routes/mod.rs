use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    cancel_ticket, confirm_digital, get_ticket, get_ticket_by_token, health_check, list_tickets,
    mark_printed, parking_status, process_exit, register_entry, ticket_image,
};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/parking", parking_routes())
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}

fn parking_routes() -> Router<AppState> {
    Router::new()
        .route("/entry", post(register_entry))
        .route("/exit", post(process_exit))
        .route("/confirm-digital/:token", post(confirm_digital))
        .route("/mark-printed/:token", post(mark_printed))
        .route("/status", get(parking_status))
        .route("/tickets", get(list_tickets))
        .route("/tickets/:id", get(get_ticket))
        .route("/tickets/:id/cancel", post(cancel_ticket))
        .route("/ticket/:token", get(get_ticket_by_token))
        .route("/ticket/:token/image", get(ticket_image))
}
