use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::Fee;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleCategory {
    Car,
    Motorcycle,
    Bicycle,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 3] = [
        VehicleCategory::Car,
        VehicleCategory::Motorcycle,
        VehicleCategory::Bicycle,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Active,
    Completed,
    Cancelled,
}

/// Delivery resolution of the physical/digital ticket hand-off. Starts at
/// `Pending` and moves exactly once to one of the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryState {
    Pending,
    ConfirmedDigital,
    Printed,
}

impl DeliveryState {
    pub const fn as_u8(self) -> u8 {
        match self {
            DeliveryState::Pending => 0,
            DeliveryState::ConfirmedDigital => 1,
            DeliveryState::Printed => 2,
        }
    }

    pub const fn from_u8(value: u8) -> DeliveryState {
        match value {
            1 => DeliveryState::ConfirmedDigital,
            2 => DeliveryState::Printed,
            _ => DeliveryState::Pending,
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, DeliveryState::Pending)
    }
}

/// License plate, normalized to uppercase. Only constructed through
/// `parse`, so a value of this type is always well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PlateNumber(String);

impl PlateNumber {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let normalized = raw.trim().to_uppercase();

        let valid_chars = normalized
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-');

        if !valid_chars || !(3..=10).contains(&normalized.len()) {
            return Err(AppError::InvalidPlate(raw.trim().to_string()));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time snapshot of a parking session, shaped for the JSON API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub qr_token: String,
    pub plate_number: PlateNumber,
    pub vehicle_type: VehicleCategory,
    pub entry_timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_fee: Option<Fee>,
    pub status: TicketStatus,
    pub delivery_state: DeliveryState,
}

/// Opaque 256-bit token, URL-safe base64 without padding (43 chars).
/// The token is the only public handle to a ticket.
pub fn generate_qr_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plate_is_normalized() {
        let plate = PlateNumber::parse("  abc-123 ").unwrap();
        assert_eq!(plate.as_str(), "ABC-123");
    }

    #[test]
    fn test_plate_rejects_bad_input() {
        assert!(PlateNumber::parse("").is_err());
        assert!(PlateNumber::parse("ab").is_err());
        assert!(PlateNumber::parse("ABCDEFGHIJK").is_err());
        assert!(PlateNumber::parse("AB?123").is_err());
        assert!(PlateNumber::parse("ÑOÑO1").is_err());
    }

    #[test]
    fn test_plate_accepts_boundary_lengths() {
        assert!(PlateNumber::parse("AB1").is_ok());
        assert!(PlateNumber::parse("AB-1234567").is_ok());
    }

    #[test]
    fn test_qr_token_shape() {
        let token = generate_qr_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_qr_tokens_are_unique() {
        let a = generate_qr_token();
        let b = generate_qr_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_delivery_state_u8_round_trip() {
        for state in [
            DeliveryState::Pending,
            DeliveryState::ConfirmedDigital,
            DeliveryState::Printed,
        ] {
            assert_eq!(DeliveryState::from_u8(state.as_u8()), state);
        }
        assert!(!DeliveryState::Pending.is_terminal());
        assert!(DeliveryState::Printed.is_terminal());
    }

    #[test]
    fn test_wire_names_are_screaming_snake() {
        let category = serde_json::to_value(VehicleCategory::Motorcycle).unwrap();
        assert_eq!(category, "MOTORCYCLE");

        let state = serde_json::to_value(DeliveryState::ConfirmedDigital).unwrap();
        assert_eq!(state, "CONFIRMED_DIGITAL");

        let status = serde_json::to_value(TicketStatus::Active).unwrap();
        assert_eq!(status, "ACTIVE");
    }
}
