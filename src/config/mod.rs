use std::env;
use std::str::FromStr;
use std::time::Duration;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

use crate::billing::{
    RateTable, DEFAULT_BICYCLE_RATE_CENTS, DEFAULT_CAR_RATE_CENTS, DEFAULT_MOTORCYCLE_RATE_CENTS,
};

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Base URL of the kiosk frontend; verification links point here.
    pub public_web_url: String,
    /// Base URL this API is reachable at, including the `/api` prefix.
    pub public_api_url: String,
    /// How long a fresh ticket may stay undelivered before it is routed
    /// to the printer.
    pub delivery_window: Duration,
    pub rates: RateTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3001,
            public_web_url: "http://localhost:3000".to_string(),
            public_api_url: "http://localhost:3001/api".to_string(),
            delivery_window: Duration::from_secs(10),
            rates: RateTable::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Self {
            port: env_parsed("PORT", defaults.port),
            public_web_url: env::var("PUBLIC_WEB_URL").unwrap_or(defaults.public_web_url),
            public_api_url: env::var("PUBLIC_API_URL").unwrap_or(defaults.public_api_url),
            delivery_window: Duration::from_secs(env_parsed("DELIVERY_WINDOW_SECS", 10)),
            rates: RateTable::new(
                env_parsed("RATE_CAR_CENTS", DEFAULT_CAR_RATE_CENTS),
                env_parsed("RATE_MOTORCYCLE_CENTS", DEFAULT_MOTORCYCLE_RATE_CENTS),
                env_parsed("RATE_BICYCLE_CENTS", DEFAULT_BICYCLE_RATE_CENTS),
            ),
        }
    }

    /// Public verification link encoded into the QR artifact.
    pub fn verify_url(&self, token: &str) -> String {
        format!(
            "{}/verify/{}",
            self.public_web_url.trim_end_matches('/'),
            token
        )
    }

    /// Where the scannable artifact for a ticket is served.
    pub fn qr_image_url(&self, token: &str) -> String {
        format!(
            "{}/parking/ticket/{}/image",
            self.public_api_url.trim_end_matches('/'),
            token
        )
    }
}

fn env_parsed<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(
                    "Config: invalid value '{}' for {}, using the default",
                    raw,
                    name
                );
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.delivery_window, Duration::from_secs(10));
    }

    #[test]
    fn test_urls_tolerate_trailing_slashes() {
        let config = Config {
            public_web_url: "http://kiosk.local/".to_string(),
            public_api_url: "http://kiosk.local/api/".to_string(),
            ..Config::default()
        };

        assert_eq!(config.verify_url("tok"), "http://kiosk.local/verify/tok");
        assert_eq!(
            config.qr_image_url("tok"),
            "http://kiosk.local/api/parking/ticket/tok/image"
        );
    }
}
