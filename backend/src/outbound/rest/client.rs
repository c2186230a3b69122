//! Reqwest client for the hosted store's PostgREST surface.
//!
//! This module owns transport details only: URL building, auth headers,
//! `Prefer` negotiation and mapping of HTTP failures into [`RestError`].
//! Table adapters translate rows into domain types.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// PostgREST error code for "the result contains 0 rows".
pub const NO_ROWS_CODE: &str = "PGRST116";
/// Postgres error code for unique constraint violations.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Transport or status failure from the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestError {
    /// The request never produced a response.
    #[error("store request failed: {message}")]
    Transport { message: String },
    /// The store answered with an error status.
    #[error("store returned status {status}: {message}")]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// The response body did not match the expected shape.
    #[error("store response could not be decoded: {message}")]
    Decode { message: String },
}

impl RestError {
    /// Whether the store reported that no row matched.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::Status { code: Some(code), .. } if code == NO_ROWS_CODE)
    }

    /// Whether a unique constraint rejected the write.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Status { status, code, .. } => {
                code.as_deref() == Some(UNIQUE_VIOLATION_CODE) || *status == 409
            }
            _ => false,
        }
    }

    /// Whether the failure is a connectivity problem rather than a bad query.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => matches!(*status, 502..=504),
            Self::Decode { .. } => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// How rows are returned from a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returning {
    Representation,
    Minimal,
}

/// Connection settings for the store.
#[derive(Debug, Clone)]
pub struct RestSettings {
    /// Project base URL, e.g. `https://project.example.co`.
    pub base_url: Url,
    /// Key sent as `apikey` and bearer token.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// PostgREST client scoped to `/rest/v1`.
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: Url,
}

impl RestClient {
    /// Build a client with auth headers preset.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is not a valid header value or the
    /// reqwest client cannot be constructed.
    pub fn new(settings: RestSettings) -> Result<Self, RestError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&settings.api_key).map_err(|err| RestError::Transport {
            message: format!("invalid api key header: {err}"),
        })?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", settings.api_key)).map_err(
            |err| RestError::Transport {
                message: format!("invalid api key header: {err}"),
            },
        )?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        let client = Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .map_err(map_transport_error)?;
        Ok(Self {
            client,
            base_url: settings.base_url,
        })
    }

    /// URL of `table` with the given query pairs.
    pub fn table_url(&self, table: &str, query: &[(&str, String)]) -> Result<Url, RestError> {
        table_url(&self.base_url, table, query)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// GET many rows.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, RestError> {
        let url = self.table_url(table, query)?;
        send_json(self.request(Method::GET, url)).await
    }

    /// GET exactly one row; [`NO_ROWS_CODE`] maps to `Ok(None)`.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, RestError> {
        let url = self.table_url(table, query)?;
        let request = self.request(Method::GET, url).header(ACCEPT, SINGLE_OBJECT);
        match send_json(request).await {
            Ok(row) => Ok(Some(row)),
            Err(err) if err.is_no_rows() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// POST `body` as new rows.
    pub async fn insert<B, T>(
        &self,
        table: &str,
        body: &B,
        returning: Returning,
    ) -> Result<Vec<T>, RestError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.table_url(table, &[])?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", prefer(returning))
            .json(body);
        match returning {
            Returning::Representation => send_json(request).await,
            Returning::Minimal => send_empty(request).await.map(|()| Vec::new()),
        }
    }

    /// PATCH rows matching `query`, returning the updated rows.
    pub async fn update<B, T>(
        &self,
        table: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>, RestError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.table_url(table, query)?;
        let request = self
            .request(Method::PATCH, url)
            .header("Prefer", prefer(Returning::Representation))
            .json(body);
        send_json(request).await
    }

    /// DELETE rows matching `query`, returning the removed rows.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, RestError> {
        let url = self.table_url(table, query)?;
        let request = self
            .request(Method::DELETE, url)
            .header("Prefer", prefer(Returning::Representation));
        send_json(request).await
    }
}

/// `eq.` filter value.
pub fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn table_url(base: &Url, table: &str, query: &[(&str, String)]) -> Result<Url, RestError> {
    let mut url = base
        .join(&format!("rest/v1/{table}"))
        .map_err(|err| RestError::Transport {
            message: format!("invalid store URL: {err}"),
        })?;
    if !query.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
    }
    Ok(url)
}

const fn prefer(returning: Returning) -> &'static str {
    match returning {
        Returning::Representation => "return=representation",
        Returning::Minimal => "return=minimal",
    }
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RestError> {
    let response = request.send().await.map_err(map_transport_error)?;
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    if !status.is_success() {
        return Err(map_status_error(status, body.as_ref()));
    }
    serde_json::from_slice(body.as_ref()).map_err(|err| RestError::Decode {
        message: err.to_string(),
    })
}

async fn send_empty(request: RequestBuilder) -> Result<(), RestError> {
    let response = request.send().await.map_err(map_transport_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.bytes().await.map_err(map_transport_error)?;
    Err(map_status_error(status, body.as_ref()))
}

fn map_transport_error(error: reqwest::Error) -> RestError {
    RestError::Transport {
        message: error.to_string(),
    }
}

pub(crate) fn map_status_error(status: StatusCode, body: &[u8]) -> RestError {
    let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();
    let code = parsed.as_ref().and_then(|body| body.code.clone());
    let message = parsed
        .and_then(|body| body.message)
        .unwrap_or_else(|| body_preview(body));
    RestError::Status {
        status: status.as_u16(),
        code,
        message,
    }
}

pub(crate) fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
