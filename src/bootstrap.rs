//! One-time startup: resolve credentials and open the document store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, StoreBackend};
use crate::credentials::{CredentialError, EnvVars, Resolver};
use crate::store::{DocumentStore, FirestoreStore, MemoryStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Every initialization attempt failed. The process must not serve traffic.
#[derive(Debug, thiserror::Error)]
#[error("Document store initialization failed after {attempts} attempt(s): {last}")]
pub struct StartupError {
    pub attempts: u32,
    #[source]
    pub last: InitError,
}

/// Run `init` up to `attempts` times with a fixed `delay` in between.
pub async fn retry<T, F, Fut>(attempts: u32, delay: Duration, mut init: F) -> Result<T, StartupError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, InitError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match init(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!("Initialization attempt {attempt}/{attempts} failed: {e}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(last) => return Err(StartupError { attempts, last }),
        }
    }
}

/// Open the configured store, reading credentials from the process
/// environment.
pub async fn connect(config: &Config) -> Result<Arc<dyn DocumentStore>, StartupError> {
    connect_with(config, &Resolver::default(), EnvVars::from_env).await
}

/// Open the configured store. For Firestore the credential chain is re-run
/// against a fresh `env()` snapshot before every attempt, which picks up keys
/// mounted or rotated while we were waiting.
pub async fn connect_with<E>(
    config: &Config,
    resolver: &Resolver,
    mut env: E,
) -> Result<Arc<dyn DocumentStore>, StartupError>
where
    E: FnMut() -> EnvVars,
{
    match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; submissions are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Firestore => {
            let settings = config.firestore_settings();
            let settings = &settings;

            retry(config.init_attempts, config.init_retry_delay, |attempt| {
                tracing::info!("Connecting to Firestore (attempt {attempt})");
                let key = resolver.resolve(&env());
                async move {
                    let store = FirestoreStore::initialize(key?, settings).await?;
                    Ok(Arc::new(store) as Arc<dyn DocumentStore>)
                }
            })
            .await
        }
    }
}
