//! Server-side countdown between ticket issuance and hand-off. Every new
//! ticket gets a timer; if the kiosk does not confirm digital delivery
//! before the window elapses, the ticket is routed to the printer so the
//! driver never leaves the gate without a ticket.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{DeliveryState, Ticket};
use crate::store::{DeliveryTransition, TicketStore};
use crate::utils::error::AppError;

pub struct DeliveryCoordinator {
    store: Arc<TicketStore>,
    window: Duration,
    timers: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl DeliveryCoordinator {
    pub fn new(store: Arc<TicketStore>, window: Duration) -> Self {
        Self {
            store,
            window,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts the countdown for a freshly issued ticket. The store's
    /// compare-and-swap is the sole authority over the delivery state, so
    /// a countdown that loses the race to a manual action is a no-op.
    pub fn arm(&self, ticket: &Ticket) {
        let store = Arc::clone(&self.store);
        let timers = Arc::clone(&self.timers);
        let window = self.window;
        let ticket_id = ticket.id;
        let token = ticket.qr_token.clone();

        // The task's self-removal takes this same lock, so holding it
        // across the spawn keeps even a zero-length window from firing
        // before its entry exists.
        let mut armed = self.timers.lock().unwrap_or_else(PoisonError::into_inner);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;

            match store.transition_delivery(&token, DeliveryState::Printed) {
                Ok(update) if matches!(update.transition, DeliveryTransition::Applied(_)) => {
                    info!(
                        ticket_id = %ticket_id,
                        window_secs = window.as_secs(),
                        "Delivery window elapsed, ticket routed to printer"
                    );
                }
                Ok(_) | Err(AppError::AlreadyDelivered { .. }) => {
                    debug!(ticket_id = %ticket_id, "Countdown lost the delivery race");
                }
                Err(e) => {
                    debug!(ticket_id = %ticket_id, error = ?e, "Countdown fired for an unknown ticket");
                }
            }

            timers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&ticket_id);
        });

        armed.insert(ticket_id, handle);
    }

    /// Driver accepted the on-screen ticket.
    pub fn confirm_digital(&self, token: &str) -> Result<DeliveryTransition, AppError> {
        self.resolve(token, DeliveryState::ConfirmedDigital)
    }

    /// Operator forced a print before the window elapsed, or the printer
    /// reported completion.
    pub fn mark_printed(&self, token: &str) -> Result<DeliveryTransition, AppError> {
        self.resolve(token, DeliveryState::Printed)
    }

    fn resolve(&self, token: &str, target: DeliveryState) -> Result<DeliveryTransition, AppError> {
        let update = self.store.transition_delivery(token, target)?;
        // Terminal either way; the countdown has nothing left to do.
        self.disarm(update.ticket_id);
        Ok(update.transition)
    }

    fn disarm(&self, ticket_id: Uuid) {
        let handle = self
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ticket_id);
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    #[cfg(test)]
    fn armed(&self, ticket_id: Uuid) -> bool {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&ticket_id)
    }
}
