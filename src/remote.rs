//! Typed client for the tracking service's HTTP API.
//!
//! The base URL is resolved from [`Configuration`] on every call, so a change
//! made in the settings page applies to the next request without a reload.

use futures::future::LocalBoxFuture;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::classify::{Lookup, RemoteProductRecord, ReportOutcome, ResetOutcome};
use crate::config::Configuration;
use crate::error::RemoteError;

/// German storefront, the only marketplace reports are filed for.
pub const MARKETPLACE_ID: &str = "A1PA6795UKMFR9";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// JSON body; sent with `Content-Type: application/json`
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one HTTP request. `Err` means the request never produced a response.
pub trait Transport {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'_, Result<HttpResponse, String>>;
}

/// Source of the current configuration. Never cached by the client.
pub trait ConfigStore {
    fn load(&self) -> LocalBoxFuture<'_, Configuration>;
}

pub struct RemoteClient<T, C> {
    transport: T,
    config: C,
}

impl<T: Transport, C: ConfigStore> RemoteClient<T, C> {
    pub fn new(transport: T, config: C) -> Self {
        RemoteClient { transport, config }
    }

    /// Freshly loaded configuration
    pub async fn configuration(&self) -> Configuration {
        self.config.load().await
    }

    /// GET `/api/product/{asin}`; 404 means the product is not tracked.
    pub async fn fetch_status(&self, asin: &str) -> Result<Lookup, RemoteError> {
        let url = self.endpoint(&format!("/api/product/{}", asin)).await;
        let call = self.call(Method::Get, url, None, true).await?;

        if call.response.status == 404 {
            log::debug!("[{}] {} not tracked (404), request {}", asin, call.url, call.id);
            return Ok(Lookup::NotFound);
        }

        let value = call.json()?;
        match RemoteProductRecord::from_value(value) {
            Some(record) => Ok(Lookup::Found(record)),
            None => Err(call.unrecognized()),
        }
    }

    /// POST `/api/product/add` for the German marketplace.
    pub async fn report(&self, asin: &str) -> Result<ReportOutcome, RemoteError> {
        let url = self.endpoint("/api/product/add").await;
        let body = json!({"asin": asin, "marketplaceId": MARKETPLACE_ID}).to_string();

        let call = self.call(Method::Post, url, Some(body), false).await?;
        call.record()
            .and_then(|record| ReportOutcome::from_record(&record))
            .ok_or_else(|| call.unrecognized())
    }

    /// GET `/api/product/{asin}/reset-removed`.
    ///
    /// The service mutates state on this GET.
    pub async fn reset_removed(&self, asin: &str) -> Result<ResetOutcome, RemoteError> {
        let url = self
            .endpoint(&format!("/api/product/{}/reset-removed", asin))
            .await;
        let call = self.call(Method::Get, url, None, false).await?;
        call.record()
            .and_then(|record| ResetOutcome::from_record(&record))
            .ok_or_else(|| call.unrecognized())
    }

    /// GET `/api/product/{asin}/full`, returned undecoded for the detail modal.
    pub async fn fetch_detail(&self, asin: &str) -> Result<Value, RemoteError> {
        let url = self.endpoint(&format!("/api/product/{}/full", asin)).await;
        let call = self.call(Method::Get, url, None, false).await?;
        call.json()
    }

    async fn endpoint(&self, path: &str) -> String {
        let config = self.config.load().await;
        format!("{}{}", config.api_root(), path)
    }

    /// Send a request; any status other than 2xx (and 404 when
    /// `accept_not_found`) is an error.
    async fn call(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
        accept_not_found: bool,
    ) -> Result<Call, RemoteError> {
        let id = request_id();
        log::debug!("Starting request {} {:?} {}", id, method, url);

        let request = HttpRequest {
            method,
            url: url.clone(),
            body,
        };
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|message| RemoteError::Network {
                request_id: id.clone(),
                url: url.clone(),
                message,
            })?;

        log::debug!("Request {} answered with {}: {}", id, response.status, response.body);

        let not_found = accept_not_found && response.status == 404;
        if !response.is_success() && !not_found {
            return Err(RemoteError::Status {
                request_id: id,
                url,
                status: response.status,
            });
        }

        Ok(Call { id, url, response })
    }
}

/// A completed request with the bits needed for error reporting
struct Call {
    id: String,
    url: String,
    response: HttpResponse,
}

impl Call {
    fn json(&self) -> Result<Value, RemoteError> {
        serde_json::from_str(&self.response.body).map_err(|source| RemoteError::Decode {
            request_id: self.id.clone(),
            url: self.url.clone(),
            source,
        })
    }

    /// Body as a record; an undecodable body counts as unrecognized.
    fn record(&self) -> Option<RemoteProductRecord> {
        self.json().ok().and_then(RemoteProductRecord::from_value)
    }

    fn unrecognized(&self) -> RemoteError {
        log::debug!("Unknown response format for request {}: {}", self.id, self.response.body);
        RemoteError::UnrecognizedResponse {
            request_id: self.id.clone(),
            url: self.url.clone(),
        }
    }
}

/// Short id for correlating log lines of one request
fn request_id() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_string()
}
