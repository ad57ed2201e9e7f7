//! Firestore REST API client.
//!
//! Production backend for [`DocumentStore`] with:
//! - Token caching with refresh margin (or no auth against the emulator)
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter
//! - Observability (tracing spans, metrics)

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, info_span, Instrument};

use crate::error::{StoreError, StoreResult};
use crate::metrics::{record_query_results, record_request};
use crate::retry::{with_retry, RetryConfig};
use crate::store::{check_doc_id, is_valid_doc_id, DocumentStore};
use crate::token_cache::TokenCache;
use crate::types::{
    BatchGetDocumentsRequest, BatchGetDocumentsResponse, Document, Fields, RunQueryRequest,
    RunQueryResponse, StructuredQuery,
};

/// Firestore caps `batchGet` requests at this many documents.
const BATCH_GET_LIMIT: usize = 100;

/// Bearer token accepted by the Firestore emulator.
const EMULATOR_TOKEN: &str = "owner";

// =============================================================================
// Configuration
// =============================================================================

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// `host:port` of a Firestore emulator; disables service-account auth.
    pub emulator_host: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                StoreError::auth_error(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access Firestore",
                )
            })?;

        if project_id.is_empty() {
            return Err(StoreError::auth_error(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST")
                .ok()
                .filter(|h| !h.is_empty()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }

    fn base_url(&self) -> String {
        let origin = match &self.emulator_host {
            Some(host) => format!("http://{}", host),
            None => "https://firestore.googleapis.com".to_string(),
        };
        format!(
            "{}/v1/projects/{}/databases/{}/documents",
            origin, self.project_id, self.database_id
        )
    }
}

// =============================================================================
// Client
// =============================================================================

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    /// `None` when talking to the emulator.
    token_cache: Option<Arc<TokenCache>>,
}

impl FirestoreClient {
    /// Create a new Firestore client.
    pub async fn new(config: FirestoreConfig) -> StoreResult<Self> {
        let token_cache = match &config.emulator_host {
            Some(host) => {
                info!("Using Firestore emulator at {}", host);
                None
            }
            None => Some(Arc::new(TokenCache::new(Self::create_auth_provider()?))),
        };

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("linkup-store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Network)?;

        let base_url = config.base_url();

        Ok(Self {
            http,
            config,
            base_url,
            token_cache,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StoreResult<Self> {
        let config = FirestoreConfig::from_env()?;
        Self::new(config).await
    }

    fn create_auth_provider() -> StoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env()
            .map_err(|e| StoreError::auth_error(format!("Failed to load service account: {}", e)))?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(StoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Full resource name, as used by batch operations.
    pub fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.config.project_id, self.config.database_id, collection, doc_id
        )
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        )
    }

    async fn access_token(&self) -> StoreResult<String> {
        match &self.token_cache {
            Some(cache) => cache.get_token().await,
            None => Ok(EMULATOR_TOKEN.to_string()),
        }
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Send a request, refreshing the token once if Firestore reports it expired.
    async fn send<F>(&self, build: F) -> StoreResult<Response>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let token = self.access_token().await?;
        let response = build(&self.http, &token).send().await?;

        let Some(cache) = &self.token_cache else {
            return Ok(response);
        };
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(StoreError::from_http_status(401, body));
        }

        debug!("Firestore access token expired, refreshing");
        cache.invalidate().await;
        let token = cache.get_token().await?;
        Ok(build(&self.http, &token).send().await?)
    }

    async fn error_from_response(url: &str, response: Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        StoreError::from_http_status(status, format!("{} failed: {}", url, body))
    }

    /// Run one operation with retry, tracing and metrics.
    async fn execute<T, F, Fut>(
        &self,
        operation: &'static str,
        collection: &str,
        op: F,
    ) -> StoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = StoreResult<T>>,
    {
        let span = info_span!("firestore_request", operation = %operation, collection = %collection);
        let start = Instant::now();
        let result = with_retry(&self.config.retry, operation, op)
            .instrument(span)
            .await;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request("firestore", operation, status, start.elapsed().as_millis() as f64);
        result
    }

    async fn get_once(&self, collection: &str, doc_id: &str) -> StoreResult<Option<Document>> {
        let url = self.document_url(collection, doc_id);
        let response = self.send(|http, token| http.get(&url).bearer_auth(token)).await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(Self::error_from_response(&url, response).await),
        }
    }

    async fn batch_get_chunk(&self, names: Vec<String>) -> StoreResult<Vec<Document>> {
        let url = format!("{}:batchGet", self.base_url);
        let request = BatchGetDocumentsRequest { documents: names };
        let response = self
            .send(|http, token| http.post(&url).bearer_auth(token).json(&request))
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::error_from_response(&url, response).await);
        }

        // batchGet answers with a JSON array, one entry per requested document.
        let entries: Vec<BatchGetDocumentsResponse> = response.json().await?;
        Ok(entries.into_iter().filter_map(|e| e.found).collect())
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    fn backend(&self) -> &'static str {
        "firestore"
    }

    async fn get_document(&self, collection: &str, doc_id: &str) -> StoreResult<Option<Document>> {
        if !is_valid_doc_id(doc_id) {
            return Ok(None);
        }
        self.execute("get_document", collection, || self.get_once(collection, doc_id))
            .await
    }

    async fn batch_get_documents(
        &self,
        collection: &str,
        doc_ids: &[String],
    ) -> StoreResult<Vec<Document>> {
        let mut docs = Vec::with_capacity(doc_ids.len());
        for chunk in doc_ids.chunks(BATCH_GET_LIMIT) {
            let names: Vec<String> = chunk
                .iter()
                .filter(|id| is_valid_doc_id(id))
                .map(|id| self.full_document_name(collection, id))
                .collect();
            if names.is_empty() {
                continue;
            }
            let found = self
                .execute("batch_get_documents", collection, || {
                    self.batch_get_chunk(names.clone())
                })
                .await?;
            docs.extend(found);
        }
        Ok(docs)
    }

    async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: Fields,
    ) -> StoreResult<Document> {
        check_doc_id(doc_id)?;
        let url = format!(
            "{}/{}?documentId={}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        );
        let body = Document::new(fields);

        self.execute("create_document", collection, || async {
            let response = self
                .send(|http, token| http.post(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
                StatusCode::CONFLICT => Err(StoreError::AlreadyExists(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                _ => Err(Self::error_from_response(&url, response).await),
            }
        })
        .await
    }

    async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: Fields,
        update_mask: Option<Vec<String>>,
    ) -> StoreResult<Document> {
        check_doc_id(doc_id)?;
        let mut params: Vec<String> = update_mask
            .unwrap_or_default()
            .iter()
            .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(f)))
            .collect();
        params.push("currentDocument.exists=true".to_string());
        let url = format!("{}?{}", self.document_url(collection, doc_id), params.join("&"));
        let body = Document::new(fields);

        self.execute("update_document", collection, || async {
            let response = self
                .send(|http, token| http.patch(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                // A failed `exists` precondition is reported as 404 or 400 FAILED_PRECONDITION.
                StatusCode::NOT_FOUND => {
                    Err(StoreError::not_found(format!("{}/{}", collection, doc_id)))
                }
                StatusCode::BAD_REQUEST => {
                    let text = response.text().await.unwrap_or_default();
                    if text.contains("FAILED_PRECONDITION") || text.contains("NOT_FOUND") {
                        Err(StoreError::not_found(format!("{}/{}", collection, doc_id)))
                    } else {
                        Err(StoreError::request_failed(format!("{} failed: {}", url, text)))
                    }
                }
                _ => Err(Self::error_from_response(&url, response).await),
            }
        })
        .await
    }

    async fn delete_document(&self, collection: &str, doc_id: &str) -> StoreResult<()> {
        if !is_valid_doc_id(doc_id) {
            return Ok(());
        }
        let url = self.document_url(collection, doc_id);

        self.execute("delete_document", collection, || async {
            let response = self
                .send(|http, token| http.delete(&url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
                StatusCode::NOT_FOUND => {
                    debug!("Document {}/{} already deleted", collection, doc_id);
                    Ok(())
                }
                _ => Err(Self::error_from_response(&url, response).await),
            }
        })
        .await
    }

    async fn run_query(
        &self,
        parent_path: &str,
        query: StructuredQuery,
    ) -> StoreResult<Vec<Document>> {
        let url = if parent_path.is_empty() {
            format!("{}:runQuery", self.base_url)
        } else {
            format!("{}/{}:runQuery", self.base_url, parent_path)
        };
        let collection = query.collection_id().unwrap_or_default().to_string();
        let request = RunQueryRequest {
            structured_query: query,
        };

        let docs = self
            .execute("run_query", &collection, || async {
                let response = self
                    .send(|http, token| http.post(&url).bearer_auth(token).json(&request))
                    .await?;

                if response.status() != StatusCode::OK {
                    return Err(Self::error_from_response(&url, response).await);
                }

                // runQuery streams a JSON array; entries without a document
                // only carry read times.
                let entries: Vec<RunQueryResponse> = response.json().await?;
                Ok(entries
                    .into_iter()
                    .filter_map(|e| e.document)
                    .collect::<Vec<_>>())
            })
            .await?;

        record_query_results(&collection, docs.len());
        Ok(docs)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.get_document("_health", "_check").await.map(|_| ())
    }

    async fn close(&self) {
        if let Some(cache) = &self.token_cache {
            cache.invalidate().await;
        }
        debug!("Firestore client closed");
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
