use std::sync::Arc;

use crate::clock::Clock;
use crate::config::Config;
use crate::delivery::DeliveryCoordinator;
use crate::qr::TicketRenderer;
use crate::store::TicketStore;

/// Shared state handed to every handler. Built once at startup; the
/// clock and renderer are injected so tests can control time and assert
/// on artifacts.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<TicketStore>,
    pub delivery: Arc<DeliveryCoordinator>,
    pub renderer: Arc<dyn TicketRenderer>,
}

impl AppState {
    pub fn new(config: Config, clock: Arc<dyn Clock>, renderer: Arc<dyn TicketRenderer>) -> Self {
        let store = Arc::new(TicketStore::new(clock, config.rates.clone()));
        let delivery = Arc::new(DeliveryCoordinator::new(
            Arc::clone(&store),
            config.delivery_window,
        ));

        Self {
            config: Arc::new(config),
            store,
            delivery,
            renderer,
        }
    }
}
