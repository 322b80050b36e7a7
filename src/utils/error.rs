use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::billing::BillingError;
use crate::models::DeliveryState;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("request body rejected: {detail}")]
    InvalidRequestBody { status: StatusCode, detail: String },

    #[error("invalid plate '{0}'")]
    InvalidPlate(String),

    #[error("active session already exists for plate {0}")]
    DuplicateActiveSession(String),

    #[error("ticket not found")]
    TicketNotFound,

    #[error("session state conflict: {0}")]
    AlreadyCompleted(String),

    #[error("delivery already resolved as {current:?}")]
    AlreadyDelivered { current: DeliveryState },

    #[error("billing rejected the interval")]
    Billing(#[from] BillingError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequestBody { status, .. } => *status,
            AppError::InvalidPlate(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateActiveSession(_) => StatusCode::CONFLICT,
            AppError::TicketNotFound => StatusCode::NOT_FOUND,
            AppError::AlreadyCompleted(_) => StatusCode::CONFLICT,
            AppError::AlreadyDelivered { .. } => StatusCode::CONFLICT,
            AppError::Billing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequestBody { .. } => "INVALID_REQUEST_BODY",
            AppError::InvalidPlate(_) => "INVALID_PLATE",
            AppError::DuplicateActiveSession(_) => "DUPLICATE_ACTIVE_SESSION",
            AppError::TicketNotFound => "TICKET_NOT_FOUND",
            AppError::AlreadyCompleted(_) => "ALREADY_COMPLETED",
            AppError::AlreadyDelivered { .. } => "ALREADY_DELIVERED",
            AppError::Billing(_) => "INVALID_INTERVAL",
        }
    }

    fn log(&self) {
        match self {
            // Needs operator follow-up: the interval came back negative,
            // which points at a clock problem on the host.
            AppError::Billing(e) => {
                error!(error = %e, "Billing rejected the interval, ticket left untouched");
            }
            _ => {
                warn!(error = ?self, code = self.code(), "Request rejected");
            }
        }
    }

    /// Operator-facing message, in the kiosk UI language.
    fn public_message(&self) -> String {
        match self {
            AppError::InvalidRequestBody { .. } => {
                "Cuerpo de la solicitud inválido".to_string()
            }
            AppError::InvalidPlate(raw) => format!(
                "Placa inválida: '{}'. Use entre 3 y 10 caracteres (letras, números o guion)",
                raw
            ),
            AppError::DuplicateActiveSession(plate) => {
                format!("Ya existe una sesión activa para la placa {}", plate)
            }
            AppError::TicketNotFound => "Ticket no encontrado".to_string(),
            AppError::AlreadyCompleted(detail) => detail.clone(),
            AppError::AlreadyDelivered { current } => match current {
                DeliveryState::ConfirmedDigital => {
                    "El ticket ya fue entregado digitalmente".to_string()
                }
                DeliveryState::Printed => "El ticket ya fue impreso".to_string(),
                DeliveryState::Pending => "El ticket sigue pendiente de entrega".to_string(),
            },
            AppError::Billing(_) => "No se pudo calcular la tarifa".to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequestBody {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose the high-level message to the client
        error_response(code, self.public_message(), status)
    }
}
