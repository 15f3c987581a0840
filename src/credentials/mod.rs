//! Service-account credential resolution.
//!
//! Credentials can come from a mounted file, inline JSON, base64-encoded JSON
//! or one environment variable per key field. [`Resolver`] tries each
//! [`CredentialSource`] in priority order and returns the first key that
//! validates.

mod key;
mod sources;

use std::collections::HashMap;
use std::path::PathBuf;

pub use key::{normalize_private_key, ServiceAccountKey};
pub use sources::{Base64JsonSource, EnvFieldsSource, FileSource, InlineJsonSource};

pub const DEFAULT_CREDENTIALS_PATH: &str = "/etc/secrets/firebase-credentials.json";

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("No credential source is configured")]
    NotConfigured,

    #[error("Credential file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read credential file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("Credential is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Credential is missing required field: {0}")]
    MissingField(&'static str),

    #[error("Credential field {field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

// serde_json quotes offending input in its messages, which for a key file
// can be the private key itself. Keep only the position.
impl From<serde_json::Error> for CredentialError {
    fn from(err: serde_json::Error) -> Self {
        let kind = match err.classify() {
            serde_json::error::Category::Io => "read error",
            serde_json::error::Category::Syntax => "syntax error",
            serde_json::error::Category::Data => "unexpected structure",
            serde_json::error::Category::Eof => "unexpected end of input",
        };
        CredentialError::MalformedJson(format!(
            "{kind} at line {} column {}",
            err.line(),
            err.column()
        ))
    }
}

/// A snapshot of environment variables. Blank values read as unset.
///
/// Deliberately not `Debug`: it holds secrets.
#[derive(Clone, Default)]
pub struct EnvVars(HashMap<String, String>);

impl EnvVars {
    pub fn from_env() -> Self {
        Self(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

pub trait CredentialSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` when this source is not configured in `env`. A configured
    /// source either yields a fully validated key or the reason it could not.
    fn try_resolve(&self, env: &EnvVars) -> Option<Result<ServiceAccountKey, CredentialError>>;
}

pub struct Resolver {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl Resolver {
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    /// The standard chain: file, inline JSON, base64 JSON, per-field variables.
    pub fn with_default_path(default_path: impl Into<PathBuf>) -> Self {
        Self::new(vec![
            Box::new(FileSource::new(default_path)),
            Box::new(InlineJsonSource),
            Box::new(Base64JsonSource),
            Box::new(EnvFieldsSource),
        ])
    }

    /// Returns the first key that validates. When every configured source
    /// fails, the highest-priority failure is returned.
    pub fn resolve(&self, env: &EnvVars) -> Result<ServiceAccountKey, CredentialError> {
        let mut first_failure = None;

        for source in &self.sources {
            match source.try_resolve(env) {
                None => tracing::debug!("Credential source {} not configured", source.name()),
                Some(Ok(key)) => {
                    tracing::info!(
                        "Resolved credentials from {} for {} (project {})",
                        source.name(),
                        key.client_email,
                        key.project_id
                    );
                    return Ok(key);
                }
                Some(Err(e)) => {
                    tracing::warn!("Credential source {} failed: {e}", source.name());
                    first_failure.get_or_insert(e);
                }
            }
        }

        Err(first_failure.unwrap_or(CredentialError::NotConfigured))
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::with_default_path(DEFAULT_CREDENTIALS_PATH)
    }
}
