use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Acknowledgement body for delivery endpoints. The kiosk only inspects
/// `success` and shows `message` verbatim.
#[derive(Serialize)]
pub struct DeliveryAck {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub code: String,
}

pub fn delivery_ack(message: impl Into<String>) -> impl IntoResponse {
    let body = DeliveryAck {
        success: true,
        message: message.into(),
    };
    (StatusCode::OK, Json(body))
}

pub fn error(code: &str, message: impl Into<String>, status: StatusCode) -> Response {
    let body = ApiErrorBody {
        message: message.into(),
        code: code.to_string(),
    };

    (status, Json(body)).into_response()
}
