//! Cloud Firestore over its REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::credentials::ServiceAccountKey;

use super::token::{truncate, TokenSource};
use super::value::{decode_fields, encode_fields};
use super::{Document, DocumentStore, Fields, StoreError};

pub const DEFAULT_DATABASE: &str = "(default)";

/// Largest page the list endpoint hands out in one response.
const LIST_PAGE_SIZE: u32 = 300;

#[derive(Debug, Clone)]
pub struct FirestoreSettings {
    /// Overrides `https://firestore.{universe_domain}`.
    pub endpoint: Option<String>,
    pub database: String,
    pub timeout: Duration,
}

impl Default for FirestoreSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            database: DEFAULT_DATABASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct FirestoreStore {
    http: reqwest::Client,
    tokens: TokenSource,
    /// `.../v1/projects/{project}/databases/{database}/documents`
    documents_url: String,
}

#[derive(Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

impl FirestoreStore {
    /// Build the client, mint a first access token and probe the database, so
    /// that bad or revoked credentials fail here rather than on the first
    /// request.
    pub async fn initialize(
        key: ServiceAccountKey,
        settings: &FirestoreSettings,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        let endpoint = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://firestore.{}", key.universe_domain));
        let documents_url = format!(
            "{}/v1/projects/{}/databases/{}/documents",
            endpoint.trim_end_matches('/'),
            key.project_id,
            settings.database
        );

        let tokens = TokenSource::new(http.clone(), key)?;
        let store = Self {
            http,
            tokens,
            documents_url,
        };

        store.tokens.refresh(None).await?;
        store.probe().await?;

        tracing::info!(
            "Connected to Firestore at {} as {}",
            store.documents_url,
            store.tokens.client_email()
        );
        Ok(store)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}", self.documents_url)
    }

    /// Send an authorized request. An authentication failure forces one token
    /// refresh and a single retry.
    async fn send<F>(&self, build: F) -> Result<Response, StoreError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let token = self.tokens.token().await?;
        match check(build(&self.http).bearer_auth(&token).send().await?).await {
            Err(e) if e.is_auth() => {
                tracing::warn!("Firestore rejected the access token, refreshing: {e}");
                let token = self.tokens.refresh(Some(token.as_str())).await?;
                check(build(&self.http).bearer_auth(&token).send().await?).await
            }
            other => other,
        }
    }
}

async fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Unauthorized(message)),
        _ => Err(StoreError::Status {
            status: status.as_u16(),
            message,
        }),
    }
}

/// Google APIs wrap errors as `{"error": {"message": ...}}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| truncate(body))
}

fn document_id(name: &str) -> Result<String, StoreError> {
    name.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StoreError::Decode(format!("document name without id: {name}")))
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn name(&self) -> &'static str {
        "firestore"
    }

    async fn probe(&self) -> Result<(), StoreError> {
        let url = format!("{}:listCollectionIds", self.documents_url);
        self.send(|http| http.post(&url).json(&json!({ "pageSize": 1 })))
            .await?;
        Ok(())
    }

    async fn write(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let url = self.collection_url(collection);
        let body = json!({ "fields": encode_fields(&fields) });

        // No documentId parameter: Firestore assigns a fresh one.
        let resp = self.send(|http| http.post(&url).json(&body)).await?;
        let created: RawDocument = resp
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("create response: {e}")))?;

        document_id(&created.name)
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let resp = self
                .send(|http| {
                    let req = http.get(&url).query(&[("pageSize", LIST_PAGE_SIZE)]);
                    match &page_token {
                        Some(token) => req.query(&[("pageToken", token)]),
                        None => req,
                    }
                })
                .await?;

            let page: ListDocumentsResponse = resp
                .json()
                .await
                .map_err(|e| StoreError::Decode(format!("list response: {e}")))?;

            for raw in page.documents {
                documents.push(Document {
                    id: document_id(&raw.name)?,
                    fields: decode_fields(&raw.fields)?,
                });
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_google_error_message() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(error_message(body), "Missing or insufficient permissions.");
        assert_eq!(error_message("upstream connect error"), "upstream connect error");
    }

    #[test]
    fn document_id_is_last_path_segment() {
        let name = "projects/p/databases/(default)/documents/submissions/Xy12AbCdEfGhIjKlMnOp";
        assert_eq!(document_id(name).unwrap(), "Xy12AbCdEfGhIjKlMnOp");
        assert!(document_id("projects/p/databases/(default)/documents/submissions/").is_err());
    }
}
