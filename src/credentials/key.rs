use std::fmt;

use serde::Deserialize;

use super::CredentialError;

pub const SERVICE_ACCOUNT_TYPE: &str = "service_account";
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_UNIVERSE_DOMAIN: &str = "googleapis.com";

/// A Google service-account key, as found in the JSON files issued by the
/// cloud console.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceAccountKey {
    pub key_type: String,
    pub project_id: String,
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    pub client_id: Option<String>,
    pub auth_uri: String,
    pub token_uri: String,
    pub auth_provider_x509_cert_url: Option<String>,
    pub client_x509_cert_url: Option<String>,
    pub universe_domain: String,
}

// The private key must never reach a log line.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .field("universe_domain", &self.universe_domain)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Parse and validate a key from its JSON text.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CredentialError> {
        let raw: RawKey = serde_json::from_slice(bytes)?;
        raw.validate()
    }
}

/// Key fields as they arrive from any source, before validation.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawKey {
    #[serde(rename = "type")]
    pub key_type: Option<String>,
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: Option<String>,
    pub client_email: Option<String>,
    pub client_id: Option<String>,
    pub auth_uri: Option<String>,
    pub token_uri: Option<String>,
    pub auth_provider_x509_cert_url: Option<String>,
    pub client_x509_cert_url: Option<String>,
    pub universe_domain: Option<String>,
}

impl RawKey {
    pub fn validate(self) -> Result<ServiceAccountKey, CredentialError> {
        let key_type = required(self.key_type, "type")?;
        if key_type != SERVICE_ACCOUNT_TYPE {
            return Err(CredentialError::InvalidField {
                field: "type",
                reason: format!("expected \"{SERVICE_ACCOUNT_TYPE}\", got \"{key_type}\""),
            });
        }

        let project_id = required(self.project_id, "project_id")?;
        let private_key = normalize_private_key(&required(self.private_key, "private_key")?);
        if !private_key.contains("-----BEGIN") || !private_key.contains("PRIVATE KEY-----") {
            return Err(CredentialError::InvalidField {
                field: "private_key",
                reason: "not a PEM-encoded private key".to_string(),
            });
        }

        let client_email = required(self.client_email, "client_email")?;
        if !client_email.contains('@') {
            return Err(CredentialError::InvalidField {
                field: "client_email",
                reason: format!("\"{client_email}\" is not an email address"),
            });
        }

        let token_uri = required(self.token_uri, "token_uri")?;

        Ok(ServiceAccountKey {
            key_type,
            project_id,
            private_key_id: optional(self.private_key_id),
            private_key,
            client_email,
            client_id: optional(self.client_id),
            auth_uri: optional(self.auth_uri).unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
            token_uri,
            auth_provider_x509_cert_url: optional(self.auth_provider_x509_cert_url),
            client_x509_cert_url: optional(self.client_x509_cert_url),
            universe_domain: optional(self.universe_domain)
                .unwrap_or_else(|| DEFAULT_UNIVERSE_DOMAIN.to_string()),
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, CredentialError> {
    optional(value).ok_or(CredentialError::MissingField(field))
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Key material passed through environment variables usually arrives with
/// its newlines escaped as the two characters `\n`.
pub fn normalize_private_key(key: &str) -> String {
    key.replace("\\r\\n", "\n").replace("\\n", "\n")
}
