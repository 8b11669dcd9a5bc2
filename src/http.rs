//! Authenticated request client.
//!
//! Every call carries the cookies in the shared [`CookieJar`]. A 401 triggers
//! one `POST /auth/refresh` and one resend of the original request; a second
//! 401, or the terminal error code, is reported through the injected
//! [`AuthExpiredNotifier`] and returned as [`ApiError::Unauthorized`].

use crate::config::Config;
use crate::cookies::CookieJar;
use crate::errors::ApiError;
use crate::events::AuthExpiredNotifier;
use crate::models::ErrorEnvelope;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// One logical request. Resending produces a new value with the retry flag
/// set; the original is never mutated.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    options: RequestOptions,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: &str, body: Option<Value>, options: RequestOptions) -> Self {
        Self {
            method,
            path: path.to_string(),
            body,
            options,
            retried: false,
        }
    }

    pub fn has_been_retried(&self) -> bool {
        self.retried
    }

    pub fn into_retry(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    notifier: Arc<dyn AuthExpiredNotifier>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        cookies: Arc<CookieJar>,
        notifier: Arc<dyn AuthExpiredNotifier>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_provider(cookies)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            notifier,
        })
    }

    pub fn from_config(
        config: &Config,
        cookies: Arc<CookieJar>,
        notifier: Arc<dyn AuthExpiredNotifier>,
    ) -> Result<Self, ApiError> {
        Self::new(&config.api_url, cookies, notifier, config.timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        self.dispatch(ApiRequest::new(method, path, body, options)).await
    }

    pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut request = request;
        loop {
            let response = self.execute(&request).await?;
            if response.status.is_success() {
                return Ok(response);
            }

            let envelope = ErrorEnvelope::parse(&response.body);
            if response.status != StatusCode::UNAUTHORIZED {
                return Err(ApiError::Status {
                    status: response.status,
                    envelope,
                });
            }

            if request.has_been_retried() || envelope.is_terminal() {
                warn!(
                    "{} {} unauthorized after refresh or with terminal code {:?}",
                    request.method, request.path, envelope.error_code
                );
                self.notifier.auth_expired();
                return Err(ApiError::Unauthorized { envelope });
            }

            self.refresh_session().await?;
            request = request.into_retry();
        }
    }

    /// Exchanges the refresh cookie for a new session cookie.
    pub async fn refresh_session(&self) -> Result<(), ApiError> {
        debug!("refreshing session");
        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            info!("session refreshed");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::RefreshFailed {
            status,
            envelope: ErrorEnvelope::parse(&body),
        })
    }

    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path));
        if !request.options.query.is_empty() {
            builder = builder.query(&request.options.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(
            "{} {}{} -> {}",
            request.method,
            request.path,
            if request.retried { " (retry)" } else { "" },
            status
        );
        Ok(ApiResponse { status, body })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.send(Method::GET, path, None, options).await?.json()
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.send(Method::POST, path, Some(body), RequestOptions::new())
            .await?
            .json()
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.send(Method::PUT, path, Some(body), RequestOptions::new())
            .await?
            .json()
    }

    /// Sends `body` and ignores whatever the server answers with on success.
    pub async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let body = serde_json::to_value(body)?;
        self.send(Method::POST, path, Some(body), RequestOptions::new())
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None, RequestOptions::new())
            .await
            .map(|_| ())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
