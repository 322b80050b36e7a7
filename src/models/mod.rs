pub mod ticket;

pub use ticket::{DeliveryState, PlateNumber, Ticket, TicketStatus, VehicleCategory};
