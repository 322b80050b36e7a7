use crate::models::Ticket;

/// Produces the scannable artifact served for a ticket. The default
/// renderer emits a deterministic placeholder SVG; a real QR encoder can
/// be swapped in behind this trait without touching any handler.
pub trait TicketRenderer: Send + Sync {
    fn render(&self, ticket: &Ticket, verify_url: &str) -> Vec<u8>;
    fn content_type(&self) -> &'static str;
}

/// Placeholder artifact: finder-style corner squares, a token-derived
/// block pattern and the verification URL in plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgTicketRenderer;

impl TicketRenderer for SvgTicketRenderer {
    fn render(&self, ticket: &Ticket, verify_url: &str) -> Vec<u8> {
        let mut cells = String::new();
        for (i, byte) in ticket.qr_token.bytes().enumerate().take(64) {
            if byte % 2 == 1 {
                let col = i % 8;
                let row = i / 8;
                cells.push_str(&format!(
                    r##"<rect x="{}" y="{}" width="16" height="16" fill="#000"/>"##,
                    56 + col * 16,
                    56 + row * 16
                ));
            }
        }

        let token_prefix = ticket.qr_token.get(..12).unwrap_or(&ticket.qr_token);

        format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="240" height="320" viewBox="0 0 240 320">
<rect width="240" height="320" fill="#fff"/>
<rect x="16" y="16" width="28" height="28" fill="#000"/>
<rect x="196" y="16" width="28" height="28" fill="#000"/>
<rect x="16" y="196" width="28" height="28" fill="#000"/>
{cells}
<text x="120" y="248" text-anchor="middle" font-family="monospace" font-size="20">{plate}</text>
<text x="120" y="270" text-anchor="middle" font-family="monospace" font-size="10">{token}</text>
<text x="120" y="300" text-anchor="middle" font-family="monospace" font-size="8">{url}</text>
</svg>"##,
            cells = cells,
            plate = ticket.plate_number,
            token = token_prefix,
            url = verify_url,
        )
        .into_bytes()
    }

    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliveryState, PlateNumber, TicketStatus, VehicleCategory};
    use uuid::Uuid;

    fn ticket() -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            qr_token: "k7aF9q2ZxYwB0cD1eF2gH3iJ4kL5mN6oP7qR8sT9uVw".to_string(),
            plate_number: PlateNumber::parse("ABC123").unwrap(),
            vehicle_type: VehicleCategory::Car,
            entry_timestamp: "2026-03-01T12:00:00Z".parse().unwrap(),
            exit_timestamp: None,
            calculated_fee: None,
            status: TicketStatus::Active,
            delivery_state: DeliveryState::Pending,
        }
    }

    #[test]
    fn test_artifact_embeds_plate_and_url() {
        let renderer = SvgTicketRenderer;
        let ticket = ticket();
        let bytes = renderer.render(&ticket, "http://localhost:3000/verify/abc");
        let svg = String::from_utf8(bytes).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("ABC123"));
        assert!(svg.contains("http://localhost:3000/verify/abc"));
        // The hex fills must survive into the document intact.
        assert!(svg.contains(r##"fill="#fff""##));
        assert!(svg.contains(r##"fill="#000""##));
        assert_eq!(renderer.content_type(), "image/svg+xml");
    }

    #[test]
    fn test_artifact_is_deterministic_per_token() {
        let renderer = SvgTicketRenderer;
        let ticket = ticket();
        let first = renderer.render(&ticket, "http://localhost:3000/verify/abc");
        let second = renderer.render(&ticket, "http://localhost:3000/verify/abc");
        assert_eq!(first, second);
    }
}
