use std::net::IpAddr;
use std::time::Duration;

use axum::http::HeaderValue;

use crate::store::FirestoreSettings;
use crate::store::firestore::DEFAULT_DATABASE;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:8000,http://localhost:5500,http://127.0.0.1:5500,http://localhost:63342";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub cors_origins: CorsOrigins,
    pub max_body_size: usize,
    pub store: StoreBackend,
    pub init_attempts: u32,
    pub init_retry_delay: Duration,
    pub request_timeout: Duration,
    pub firestore_database: String,
    pub firestore_endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CorsOrigins {
    /// Mirror whatever origin the browser sends.
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let host: IpAddr = env_or("SIGNUPS_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid SIGNUPS_HOST: {e}"))?;

        // PORT is what most hosting platforms inject.
        let port: u16 = std::env::var("SIGNUPS_PORT")
            .or_else(|_| std::env::var("PORT"))
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| format!("Invalid SIGNUPS_PORT: {e}"))?;

        let log_level = env_or("SIGNUPS_LOG_LEVEL", "info");

        let cors_origins = parse_cors_origins(&env_or("SIGNUPS_CORS_ORIGINS", DEFAULT_CORS_ORIGINS))?;

        let max_body_size: usize = env_or("SIGNUPS_MAX_BODY_SIZE", "65536")
            .parse()
            .map_err(|e| format!("Invalid SIGNUPS_MAX_BODY_SIZE: {e}"))?;

        let store = match env_or("SIGNUPS_STORE", "firestore").as_str() {
            "firestore" => StoreBackend::Firestore,
            "memory" => StoreBackend::Memory,
            other => return Err(format!("Invalid SIGNUPS_STORE '{other}': expected firestore or memory")),
        };

        let init_attempts: u32 = env_or("SIGNUPS_INIT_ATTEMPTS", "3")
            .parse()
            .map_err(|e| format!("Invalid SIGNUPS_INIT_ATTEMPTS: {e}"))?;
        if init_attempts == 0 {
            return Err("SIGNUPS_INIT_ATTEMPTS must be at least 1".to_string());
        }

        let init_retry_delay = Duration::from_secs(
            env_or("SIGNUPS_INIT_RETRY_DELAY_SECS", "2")
                .parse()
                .map_err(|e| format!("Invalid SIGNUPS_INIT_RETRY_DELAY_SECS: {e}"))?,
        );

        let request_timeout = Duration::from_secs(
            env_or("SIGNUPS_REQUEST_TIMEOUT_SECS", "30")
                .parse()
                .map_err(|e| format!("Invalid SIGNUPS_REQUEST_TIMEOUT_SECS: {e}"))?,
        );

        let firestore_database = env_or("FIRESTORE_DATABASE", DEFAULT_DATABASE);
        let firestore_endpoint = std::env::var("FIRESTORE_ENDPOINT")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Config {
            host,
            port,
            log_level,
            cors_origins,
            max_body_size,
            store,
            init_attempts,
            init_retry_delay,
            request_timeout,
            firestore_database,
            firestore_endpoint,
        })
    }

    pub fn firestore_settings(&self) -> FirestoreSettings {
        FirestoreSettings {
            endpoint: self.firestore_endpoint.clone(),
            database: self.firestore_database.clone(),
            timeout: self.request_timeout,
        }
    }
}

pub fn parse_cors_origins(raw: &str) -> Result<CorsOrigins, String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if origins.iter().any(|o| o == "*") {
        return Ok(CorsOrigins::Any);
    }

    for origin in &origins {
        HeaderValue::from_str(origin)
            .map_err(|e| format!("Invalid SIGNUPS_CORS_ORIGINS entry '{origin}': {e}"))?;
    }

    Ok(CorsOrigins::List(origins))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
