pub mod billing;
pub mod clock;
pub mod config;
pub mod delivery;
pub mod handlers;
pub mod models;
pub mod qr;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;

pub use state::AppState;
