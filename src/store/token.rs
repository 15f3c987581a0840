use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::credentials::ServiceAccountKey;

use super::StoreError;

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Google's tokens last an hour; anything outside a day is not trusted.
const DEFAULT_LIFETIME_SECS: i64 = 3600;
const MAX_LIFETIME_SECS: i64 = 86_400;

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl AssertionClaims {
    fn new(key: &ServiceAccountKey, now: DateTime<Utc>) -> Self {
        Self {
            iss: key.client_email.clone(),
            scope: DATASTORE_SCOPE.to_string(),
            aud: key.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now()
    }
}

/// OAuth2 access tokens minted with the service account's JWT-bearer grant.
pub struct TokenSource {
    http: reqwest::Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    cached: RwLock<Option<AccessToken>>,
}

impl TokenSource {
    pub fn new(http: reqwest::Client, key: ServiceAccountKey) -> Result<Self, StoreError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self {
            http,
            key,
            signing_key,
            cached: RwLock::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// A cached token if still fresh, otherwise a newly minted one.
    pub async fn token(&self) -> Result<String, StoreError> {
        if let Some(token) = self.cached.read().await.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let mut cached = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }
        let token = self.fetch().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Mint a new token to replace `rejected`. When concurrent callers were
    /// all turned away with the same token, only the first mints; the rest
    /// pick up its replacement.
    pub async fn refresh(&self, rejected: Option<&str>) -> Result<String, StoreError> {
        let mut cached = self.cached.write().await;
        if let Some(token) = cached
            .as_ref()
            .filter(|t| t.is_fresh() && rejected.is_some_and(|r| r != t.value))
        {
            return Ok(token.value.clone());
        }
        *cached = None;
        let token = self.fetch().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch(&self) -> Result<AccessToken, StoreError> {
        let now = Utc::now();
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        let assertion = encode(
            &header,
            &AssertionClaims::new(&self.key, now),
            &self.signing_key,
        )?;

        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = format!("token endpoint returned {status}: {}", truncate(&body));
            // invalid_grant (revoked or rotated key) comes back as 400.
            return Err(if status.is_client_error() {
                StoreError::Unauthorized(message)
            } else {
                StoreError::Status {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("token response: {e}")))?;

        tracing::debug!("Obtained access token for {}", self.key.client_email);

        Ok(AccessToken {
            value: body.access_token,
            expires_at: now + token_lifetime(body.expires_in),
        })
    }
}

/// `expires_in` as reported, or the default when absent or implausible.
fn token_lifetime(expires_in: Option<i64>) -> Duration {
    let secs = expires_in
        .filter(|s| (1..=MAX_LIFETIME_SECS).contains(s))
        .unwrap_or(DEFAULT_LIFETIME_SECS);
    Duration::seconds(secs)
}

pub(crate) fn truncate(body: &str) -> String {
    body.chars().take(512).collect()
}
