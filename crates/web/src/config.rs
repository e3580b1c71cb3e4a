use std::{env, net::SocketAddr, path::PathBuf};

use axum::http::HeaderValue;
use thiserror::Error;

const BIND_ADDRESS: &str = "BIND_ADDRESS";
const CLIENT_URL: &str = "CLIENT_URL";
const STATIC_DIR: &str = "STATIC_DIR";

#[derive(Debug, Error)]
pub enum WebConfigError {
    #[error("invalid value `{value}` for `{key}`")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub bind_address: SocketAddr,
    /// Origin allowed to call the api from a browser.
    pub client_url: HeaderValue,
    /// Directory the front end is served from.
    pub static_dir: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            client_url: HeaderValue::from_static("http://localhost:5173"),
            static_dir: PathBuf::from("./resources/www/"),
        }
    }
}

impl WebConfig {
    pub fn from_env() -> Result<Self, WebConfigError> {
        let mut config = Self::default();
        if let Ok(value) = env::var(BIND_ADDRESS) {
            config.bind_address = value.trim().parse().map_err(|_| {
                WebConfigError::Invalid {
                    key: BIND_ADDRESS,
                    value: value.clone(),
                }
            })?;
        }
        if let Ok(value) = env::var(CLIENT_URL) {
            config.client_url = HeaderValue::from_str(value.trim().trim_end_matches('/'))
                .map_err(|_| WebConfigError::Invalid {
                    key: CLIENT_URL,
                    value: value.clone(),
                })?;
        }
        if let Ok(value) = env::var(STATIC_DIR) {
            config.static_dir = PathBuf::from(value);
        }
        Ok(config)
    }

    pub(crate) fn not_found_page(&self) -> PathBuf {
        self.static_dir.join("error404.html")
    }
}
