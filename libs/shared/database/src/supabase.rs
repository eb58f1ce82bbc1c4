use anyhow::Result;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_RANGE, CONTENT_TYPE, AUTHORIZATION},
    Method, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Non-success answers from PostgREST, kept typed so callers can
/// `downcast_ref` on the `anyhow::Error` and react to a specific status.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SupabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
}

impl SupabaseError {
    fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => SupabaseError::Auth(body),
            404 => SupabaseError::NotFound(body),
            409 => SupabaseError::Conflict(body),
            code => SupabaseError::Api { status: code, body },
        }
    }

    /// SQLSTATE from the PostgREST error body, when it carries one.
    pub fn postgres_code(&self) -> Option<String> {
        let body = match self {
            SupabaseError::Auth(body)
            | SupabaseError::NotFound(body)
            | SupabaseError::Conflict(body)
            | SupabaseError::Api { body, .. } => body,
        };

        serde_json::from_str::<Value>(body)
            .ok()?
            .get("code")?
            .as_str()
            .map(str::to_string)
    }
}

const UNIQUE_VIOLATION: &str = "23505";

/// Returns true when `err` is a 409 caused by a unique index. Foreign key
/// violations (23503) also come back as 409 and are not matched.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<SupabaseError>() {
        Some(conflict @ SupabaseError::Conflict(_)) => {
            conflict.postgres_code().as_deref() == Some(UNIQUE_VIOLATION)
        }
        _ => false,
    }
}

/// Total from a `Content-Range` value such as `0-24/3573` or `*/0`.
pub fn content_range_total(value: &str) -> Result<u64> {
    let total = value
        .rsplit_once('/')
        .map(|(_, total)| total.trim())
        .ok_or_else(|| anyhow::anyhow!("Malformed Content-Range: {}", value))?;

    total
        .parse::<u64>()
        .map_err(|_| anyhow::anyhow!("Content-Range carries no exact total: {}", value))
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where T: DeserializeOwned {
        let response = self.send(method, path, auth_token, body, extra_headers).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Number of rows matched by `path`. Asks PostgREST for an exact count
    /// and reads it from `Content-Range`, so the server's `max-rows` limit
    /// does not cap it.
    pub async fn count(&self, path: &str, auth_token: Option<&str>) -> Result<u64> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let response = self.send(Method::HEAD, path, auth_token, None, Some(headers)).await?;
        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .ok_or_else(|| anyhow::anyhow!("Count response for {} has no Content-Range", path))?
            .to_str()?;

        content_range_total(range)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);
            return Err(SupabaseError::from_status(status, error_text).into());
        }

        Ok(response)
    }

    /// Inserts a row and returns the stored representation.
    pub async fn insert<T>(&self, table: &str, auth_token: &str, row: Value) -> Result<Vec<T>>
    where T: DeserializeOwned {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(
            Method::POST,
            &format!("/rest/v1/{}", table),
            Some(auth_token),
            Some(row),
            Some(headers),
        ).await
    }

    /// Calls a Postgres function exposed under `/rest/v1/rpc`. One call is
    /// one statement on the database side, which is what the sequence
    /// counters rely on.
    pub async fn rpc<T>(&self, function: &str, auth_token: Option<&str>, args: Value) -> Result<T>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request(Method::POST, &path, auth_token, Some(args)).await
    }
}
