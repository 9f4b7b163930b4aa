//! Reqwest-backed implementations of the remote collaborator contracts.
//!
//! The business modules all speak the same envelope dialect: list
//! endpoints return `{"items": [...], "pagination": {...}}` (pagination
//! absent for search/filter contexts), mutations answer with the updated
//! entity or an empty body, and comment submissions are a single
//! multipart request carrying the text and every staged file.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::attachments::PendingFile;
use crate::config::CoreConfig;
use crate::constants::{HTTP_TIMEOUT_SECS, PAGE_PARAM};
use crate::error::{ApiError, ApiResult};
use crate::models::{HasId, PageCursor};
use crate::search::SearchBackend;
use crate::store::{FetchedPage, PageFetcher};

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct ListEnvelope<T> {
    #[serde(default)]
    items: Vec<T>,
    #[serde(default)]
    pagination: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    current_page: u32,
    total_pages: u32,
    total_items: u64,
    page_size: u32,
}

impl PageMeta {
    fn into_cursor(self) -> PageCursor {
        PageCursor::new(
            self.current_page,
            self.total_pages,
            self.total_items,
            self.page_size,
        )
    }
}

/// Error payload shape shared by the business modules.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

fn extract_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.message.or(parsed.error)
}

pub struct RestClient {
    http: reqwest::Client,
    base: String,
    auth_token: Option<String>,
}

impl RestClient {
    pub fn new(config: &CoreConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base: config.api_base.clone(),
            auth_token: config.auth_token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Map a non-success status to `ApiError::Rejected`, pulling the
    /// message out of the error body when the server sent one.
    async fn checked(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    /// Fetch one page of a list endpoint.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        page: u32,
    ) -> ApiResult<FetchedPage<T>> {
        let response = self
            .request(Method::GET, path)
            .query(query)
            .query(&[(PAGE_PARAM, page.to_string())])
            .send()
            .await?;
        let envelope: ListEnvelope<T> = Self::checked(response).await?.json().await?;
        Ok(FetchedPage {
            items: envelope.items,
            cursor: envelope.pagination.map(PageMeta::into_cursor),
        })
    }

    /// Fetch an unpaginated candidate list (search endpoints).
    pub async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> ApiResult<Vec<T>> {
        let response = self.request(Method::GET, path).query(query).send().await?;
        let envelope: ListEnvelope<T> = Self::checked(response).await?.json().await?;
        Ok(envelope.items)
    }

    /// Execute a mutation call. Returns `None` when the server answered
    /// with no body worth merging (204 or an empty payload).
    pub async fn send_json<T, Body>(
        &self,
        method: Method,
        path: &str,
        body: &Body,
    ) -> ApiResult<Option<T>>
    where
        T: DeserializeOwned,
        Body: Serialize + Sync + ?Sized,
    {
        let response = self.request(method, path).json(body).send().await?;
        let response = Self::checked(response).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Transport(format!("invalid response body: {e}")))?;
        Ok(Some(value))
    }

    /// Submit a comment as one multipart request: the text plus a part
    /// per staged file, bytes read from each file's local path. Reading
    /// happens before anything is sent, so a missing file fails the
    /// submission as a whole.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        text_field: &str,
        text: &str,
        files: &[PendingFile],
    ) -> ApiResult<T> {
        let mut form = Form::new().text(text_field.to_string(), text.to_string());
        for file in files {
            let bytes = tokio::fs::read(&file.local_path).await.map_err(|e| {
                ApiError::Transport(format!(
                    "failed to read {}: {e}",
                    file.local_path.display()
                ))
            })?;
            let part = Part::bytes(bytes)
                .file_name(file.display_name.clone())
                .mime_str(&file.mime_type)
                .map_err(|e| {
                    ApiError::Transport(format!("invalid mime type {}: {e}", file.mime_type))
                })?;
            form = form.part("files[]", part);
        }
        let response = self
            .request(Method::POST, path)
            .multipart(form)
            .send()
            .await?;
        Self::checked(response)
            .await?
            .json()
            .await
            .map_err(ApiError::from)
    }
}

/// Filter/search parameters for a list context.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub params: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn search(self, text: impl Into<String>) -> Self {
        self.filter("search", text)
    }
}

/// A conventional paginated collection endpoint, e.g. `leads` or
/// `hr/requests`.
pub struct ListEndpoint<T> {
    client: Arc<RestClient>,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ListEndpoint<T> {
    pub fn new(client: Arc<RestClient>, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T> PageFetcher for ListEndpoint<T>
where
    T: DeserializeOwned + HasId + Clone + Send + Sync + 'static,
{
    type Item = T;
    type Context = ListQuery;

    async fn fetch_page(&self, context: &ListQuery, page: u32) -> ApiResult<FetchedPage<T>> {
        self.client.get_page(&self.path, &context.params, page).await
    }
}

/// A conventional candidate-lookup endpoint, e.g. `collaborators/search`.
pub struct SearchEndpoint<H> {
    client: Arc<RestClient>,
    path: String,
    query_param: String,
    _marker: PhantomData<fn() -> H>,
}

impl<H> SearchEndpoint<H> {
    pub fn new(client: Arc<RestClient>, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            query_param: "q".to_string(),
            _marker: PhantomData,
        }
    }

    pub fn with_query_param(mut self, param: impl Into<String>) -> Self {
        self.query_param = param.into();
        self
    }
}

#[async_trait]
impl<H> SearchBackend for SearchEndpoint<H>
where
    H: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Hit = H;

    async fn search(&self, query: &str) -> ApiResult<Vec<H>> {
        self.client
            .get_list(&self.path, &[(self.query_param.clone(), query.to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct LeadRow {
        id: String,
        company: String,
    }

    impl HasId for LeadRow {
        fn id(&self) -> &str {
            &self.id
        }
    }

    /// Answer exactly one connection with a canned HTTP response, then
    /// go away. Enough of a server for parsing and error-mapping tests.
    async fn respond_once(status_line: &str, body: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 16384];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_get_page_parses_envelope_and_cursor() {
        let body = r#"{
            "items": [
                {"id": "l1", "company": "Acme"},
                {"id": "l2", "company": "Globex"}
            ],
            "pagination": {"current_page": 1, "total_pages": 3, "total_items": 25, "page_size": 10}
        }"#;
        let base = respond_once("200 OK", body).await;
        let client = RestClient::new(&CoreConfig::new(base).with_token("tok-123"));

        let page: FetchedPage<LeadRow> = client.get_page("leads", &[], 1).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].company, "Acme");
        let cursor = page.cursor.unwrap();
        assert_eq!(cursor.current_page, 1);
        assert!(cursor.has_next);
        assert!(!cursor.has_previous);
    }

    #[tokio::test]
    async fn test_search_envelope_without_pagination_has_no_cursor() {
        let body = r#"{"items": [{"id": "l9", "company": "Initech"}]}"#;
        let base = respond_once("200 OK", body).await;
        let client = RestClient::new(&CoreConfig::new(base));

        let page: FetchedPage<LeadRow> = client.get_page("leads", &[], 1).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert!(page.cursor.is_none());
    }

    #[tokio::test]
    async fn test_rejection_carries_status_and_server_message() {
        let base = respond_once(
            "422 Unprocessable Entity",
            r#"{"message": "company name is required"}"#,
        )
        .await;
        let client = RestClient::new(&CoreConfig::new(base));

        let err = client
            .get_list::<LeadRow>("leads", &[])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Rejected {
                status: 422,
                message: "company name is required".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_rejection_without_body_falls_back_to_reason_phrase() {
        let base = respond_once("500 Internal Server Error", "").await;
        let client = RestClient::new(&CoreConfig::new(base));

        let err = client
            .get_list::<LeadRow>("leads", &[])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Rejected {
                status: 500,
                message: "Internal Server Error".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_send_json_treats_empty_body_as_nothing_to_merge() {
        let base = respond_once("204 No Content", "").await;
        let client = RestClient::new(&CoreConfig::new(base));

        let merged: Option<LeadRow> = client
            .send_json(Method::PATCH, "leads/l1", &serde_json::json!({"stage": "won"}))
            .await
            .unwrap();

        assert!(merged.is_none());
    }

    #[tokio::test]
    async fn test_post_multipart_reads_staged_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visit.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();

        let body = r#"{"id": "l1", "company": "Acme"}"#;
        let base = respond_once("201 Created", body).await;
        let client = RestClient::new(&CoreConfig::new(base));

        let file = PendingFile::new(&path, "image/jpeg");
        let created: LeadRow = client
            .post_multipart("leads/l1/comments", "text", "see photo", &[file])
            .await
            .unwrap();

        assert_eq!(created.id, "l1");
    }

    #[tokio::test]
    async fn test_post_multipart_fails_whole_submission_on_missing_file() {
        // No server: the read fails before anything is sent
        let client = RestClient::new(&CoreConfig::new("http://127.0.0.1:9"));
        let file = PendingFile::new("/nonexistent/evidence.jpg", "image/jpeg");

        let err = client
            .post_multipart::<LeadRow>("leads/l1/comments", "text", "see photo", &[file])
            .await
            .unwrap_err();

        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_list_endpoint_feeds_a_remote_list_store() {
        use crate::events::EventSink;
        use crate::store::RemoteListStore;

        let body = r#"{
            "items": [{"id": "l1", "company": "Acme"}, {"id": "l2", "company": "Globex"}],
            "pagination": {"current_page": 1, "total_pages": 1, "total_items": 2, "page_size": 10}
        }"#;
        let base = respond_once("200 OK", body).await;
        let client = Arc::new(RestClient::new(&CoreConfig::new(base)));

        let store = RemoteListStore::new(
            "leads",
            ListEndpoint::<LeadRow>::new(client, "leads"),
            EventSink::disconnected(),
        );
        let count = store
            .load(&ListQuery::new().filter("status", "open"))
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert!(!store.cursor().unwrap().has_next);
    }

    #[tokio::test]
    async fn test_search_endpoint_returns_candidates() {
        let body = r#"{"items": [{"id": "u7", "company": "Ana Torres"}]}"#;
        let base = respond_once("200 OK", body).await;
        let client = Arc::new(RestClient::new(&CoreConfig::new(base)));

        let endpoint =
            SearchEndpoint::<LeadRow>::new(client, "collaborators/search").with_query_param("name");
        let hits = endpoint.search("ana").await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "u7");
    }

    #[test]
    fn test_error_message_extraction_prefers_message_field() {
        assert_eq!(
            extract_message(r#"{"message": "nope", "error": "other"}"#).as_deref(),
            Some("nope")
        );
        assert_eq!(
            extract_message(r#"{"error": "forbidden"}"#).as_deref(),
            Some("forbidden")
        );
        assert!(extract_message("plain text").is_none());
    }

    #[test]
    fn test_list_query_builder_accumulates_params() {
        let query = ListQuery::new()
            .filter("status", "open")
            .search("acme");
        assert_eq!(
            query.params,
            vec![
                ("status".to_string(), "open".to_string()),
                ("search".to_string(), "acme".to_string()),
            ]
        );
    }
}
