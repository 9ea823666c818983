//! Elasticsearch HTTP client

use super::error::{SearchError, SearchResult};
use super::query::{decode_page, fbi_search_body, stac_search_body, FBI_PATH_FIELD, STAC_URI_FIELD};
use super::types::{FbiPageRequest, Page, StacPageRequest};
use super::SearchBackend;
use crate::config::{ElasticsearchSession, KeepAlive};
use crate::core::retry::{retry_async_if, RetryPolicy};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

/// Longest error body kept in [`SearchError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// [`SearchBackend`] over the Elasticsearch REST API
///
/// Hosts are tried in order for each request; transient failures are retried
/// with the configured [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct ElasticClient {
    http: reqwest::Client,
    hosts: Vec<String>,
    retry: RetryPolicy,
}

impl ElasticClient {
    /// Build a client from the `ELASTICSEARCH.SESSION_KWARGS` section
    pub fn from_session(session: &ElasticsearchSession) -> SearchResult<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &session.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                SearchError::Client {
                    message: format!("invalid header name '{name}': {e}"),
                }
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| SearchError::Client {
                message: format!("invalid value for header '{name}': {e}"),
            })?;
            headers.insert(header_name, header_value);
        }

        if !session.verify_certs && session.ssl_show_warn {
            log::warn!("TLS certificate verification is disabled for Elasticsearch");
        }

        let http = reqwest::Client::builder()
            .timeout(session.timeout_duration())
            .danger_accept_invalid_certs(!session.verify_certs)
            .default_headers(headers)
            .build()
            .map_err(|e| SearchError::Client {
                message: e.to_string(),
            })?;

        let hosts = session.base_urls();
        if hosts.is_empty() {
            return Err(SearchError::Client {
                message: "no Elasticsearch hosts configured".to_string(),
            });
        }

        Ok(Self {
            http,
            hosts,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Send a request, returning `None` for a 404 when `allow_not_found` is set
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        allow_not_found: bool,
    ) -> SearchResult<Option<Value>> {
        retry_async_if(
            path,
            self.retry.clone(),
            SearchError::is_transient,
            || self.attempt(method.clone(), path, body, allow_not_found),
        )
        .await
    }

    async fn attempt(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        allow_not_found: bool,
    ) -> SearchResult<Option<Value>> {
        let mut last_error = None;

        for host in &self.hosts {
            let url = format!("{host}{path}");
            let mut builder = self.http.request(method.clone(), &url);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            match builder.send().await {
                Ok(response) => return Self::decode(url, response, allow_not_found).await,
                Err(source) => {
                    log::debug!("{} {} failed, trying next host: {}", method, url, source);
                    last_error = Some(SearchError::Transport { url, source });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SearchError::Client {
            message: "no Elasticsearch hosts configured".to_string(),
        }))
    }

    async fn decode(
        url: String,
        response: reqwest::Response,
        allow_not_found: bool,
    ) -> SearchResult<Option<Value>> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND && allow_not_found {
            return Ok(None);
        }
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(SearchError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map(Some)
            .map_err(|source| SearchError::Transport { url, source })
    }

    async fn expect_body(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> SearchResult<Value> {
        self.request(method, path, body, false)
            .await?
            .ok_or_else(|| SearchError::response(format!("empty response from {path}")))
    }
}

#[async_trait]
impl SearchBackend for ElasticClient {
    async fn open_point_in_time(
        &self,
        index: &str,
        keep_alive: &KeepAlive,
    ) -> SearchResult<String> {
        let path = format!("/{index}/_pit?keep_alive={keep_alive}");
        let response = self.expect_body(Method::POST, &path, None).await?;
        let pit_id = response
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::response("point in time response without id"))?;
        log::debug!("Opened point in time on {} (keep alive {})", index, keep_alive);
        Ok(pit_id.to_string())
    }

    async fn close_point_in_time(&self, pit_id: &str) -> SearchResult<()> {
        let body = json!({ "id": pit_id });
        match self.request(Method::DELETE, "/_pit", Some(&body), true).await? {
            Some(_) => log::debug!("Closed point in time"),
            None => log::debug!("Point in time already released"),
        }
        Ok(())
    }

    async fn fbi_page(&self, request: &FbiPageRequest) -> SearchResult<Page> {
        let body = fbi_search_body(request);
        match self.request(Method::POST, "/_search", Some(&body), true).await? {
            Some(response) => decode_page(response, FBI_PATH_FIELD),
            None => Err(SearchError::PitNotFound {
                pit_id: request.pit_id.clone(),
            }),
        }
    }

    async fn stac_page(&self, request: &StacPageRequest) -> SearchResult<Page> {
        let body = stac_search_body(request);
        let path = format!("/{}/_search", request.index);
        let response = self.expect_body(Method::POST, &path, Some(&body)).await?;
        decode_page(response, STAC_URI_FIELD)
    }

    async fn get_document(&self, index: &str, id: &str) -> SearchResult<Option<Value>> {
        let path = format!("/{index}/_doc/{id}");
        Ok(self
            .request(Method::GET, &path, None, true)
            .await?
            .and_then(|mut response| response.get_mut("_source").map(Value::take)))
    }

    async fn put_document(&self, index: &str, id: &str, body: &Value) -> SearchResult<()> {
        let path = format!("/{index}/_doc/{id}");
        self.expect_body(Method::PUT, &path, Some(body)).await?;
        Ok(())
    }
}
