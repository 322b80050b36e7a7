use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::{self, Fee};
use crate::models::{PlateNumber, Ticket, TicketStatus, VehicleCategory};
use crate::state::AppState;
use crate::store::DeliveryTransition;
use crate::utils::error::AppError;
use crate::utils::extract::ApiJson;
use crate::utils::response::delivery_ack;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRequest {
    pub plate_number: String,
    pub vehicle_type: VehicleCategory,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitRequest {
    pub qr_token: String,
}

/// Ticket payload shared by every session endpoint. Fields that do not
/// apply to a given operation are omitted from the JSON entirely.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub ticket: Ticket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_elapsed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_fee: Option<Fee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_hours: Option<u64>,
}

impl TicketResponse {
    fn bare(ticket: Ticket) -> Self {
        Self {
            ticket,
            qr_code: None,
            verify_url: None,
            time_elapsed: None,
            estimated_fee: None,
            total_minutes: None,
            total_hours: None,
        }
    }
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthPayload {
        status: "ok",
        service: "parqueo-api",
    })
}

/// Opens a session for a vehicle and arms the delivery countdown.
pub async fn register_entry(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let plate = PlateNumber::parse(&request.plate_number)?;
    let ticket = state.store.create(plate, request.vehicle_type)?;
    state.delivery.arm(&ticket);

    let qr_code = state.config.qr_image_url(&ticket.qr_token);
    let verify_url = state.config.verify_url(&ticket.qr_token);

    Ok((
        StatusCode::CREATED,
        Json(TicketResponse {
            qr_code: Some(qr_code),
            verify_url: Some(verify_url),
            ..TicketResponse::bare(ticket)
        }),
    ))
}

/// Settles the session behind a scanned token. Safe to retry; a settled
/// session replies with its stored fee.
pub async fn process_exit(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ExitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let settlement = state.store.complete_exit(&request.qr_token)?;

    Ok(Json(TicketResponse {
        total_minutes: Some(settlement.total_minutes),
        total_hours: Some(settlement.total_hours),
        ..TicketResponse::bare(settlement.ticket)
    }))
}

pub async fn confirm_digital(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let transition = state.delivery.confirm_digital(&token)?;
    let message = match transition {
        DeliveryTransition::Applied(_) => "Entrega digital confirmada",
        DeliveryTransition::AlreadyInRequestedState(_) => {
            "La entrega digital ya estaba confirmada"
        }
    };
    Ok(delivery_ack(message))
}

pub async fn mark_printed(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let transition = state.delivery.mark_printed(&token)?;
    let message = match transition {
        DeliveryTransition::Applied(_) => "Impresión registrada",
        DeliveryTransition::AlreadyInRequestedState(_) => "La impresión ya estaba registrada",
    };
    Ok(delivery_ack(message))
}

/// Live dashboard aggregate.
pub async fn parking_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.status_snapshot())
}

/// Full history in insertion order, with informational elapsed time and
/// fee estimates.
pub async fn list_tickets(State(state): State<AppState>) -> impl IntoResponse {
    let now = state.store.now();
    let tickets: Vec<TicketResponse> = state
        .store
        .list_all()
        .into_iter()
        .map(|ticket| detail_response(&state, ticket, now))
        .collect();
    Json(tickets)
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = state.store.lookup_by_id(ticket_id)?;
    let now = state.store.now();
    Ok(Json(detail_response(&state, ticket, now)))
}

/// Public lookup used by the verification page; the token is the only
/// credential.
pub async fn get_ticket_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = state.store.lookup_by_token(&token)?;
    let now = state.store.now();
    Ok(Json(detail_response(&state, ticket, now)))
}

/// Scannable artifact for a ticket, rendered on demand.
pub async fn ticket_image(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = state.store.lookup_by_token(&token)?;
    let verify_url = state.config.verify_url(&ticket.qr_token);
    let bytes = state.renderer.render(&ticket, &verify_url);

    Ok((
        [(header::CONTENT_TYPE, state.renderer.content_type())],
        bytes,
    ))
}

/// Operator correction for a mistaken entry. No fee is charged.
pub async fn cancel_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = state.store.cancel(ticket_id)?;
    Ok(Json(TicketResponse::bare(ticket)))
}

fn detail_response(state: &AppState, ticket: Ticket, now: DateTime<Utc>) -> TicketResponse {
    let (time_elapsed, estimated_fee) = match ticket.status {
        TicketStatus::Active => {
            let rate = state.store.rates().rate_for(ticket.vehicle_type);
            (
                billing::elapsed_minutes(ticket.entry_timestamp, now),
                billing::estimate_fee(ticket.entry_timestamp, now, rate),
            )
        }
        // Settled sessions report their frozen interval and fee.
        TicketStatus::Completed => (
            ticket
                .exit_timestamp
                .map(|exit| billing::elapsed_minutes(ticket.entry_timestamp, exit))
                .unwrap_or(0),
            ticket.calculated_fee,
        ),
        TicketStatus::Cancelled => (0, None),
    };

    TicketResponse {
        time_elapsed: Some(time_elapsed),
        estimated_fee,
        ..TicketResponse::bare(ticket)
    }
}
