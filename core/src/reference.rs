//! A bound location in the remote tree and the operations on it.
//!
//! # Design
//! As in a host-does-IO client, each operation is split into a pure
//! `build_*` method producing an `HttpRequest` and a `parse_*` method
//! consuming an `HttpResponse`. The async methods chain the two around one
//! `Transport` call made on tokio's blocking pool. Callers that want to drive
//! the I/O themselves can use the build/parse halves directly.
//!
//! `parse_*` is where the auth-debug header is reported to the logger, so the
//! async path reports it exactly once per response.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, ResponseError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::logger::Logger;
use crate::query::Query;
use crate::target::Location;
use crate::transport::Transport;

/// Response header carrying the server's explanation of an auth decision.
pub const AUTH_DEBUG_HEADER: &str = "x-firebase-auth-debug";

const JSON_CONTENT_TYPE: (&str, &str) = ("content-type", "application/json");

/// Handle on one path of the remote tree.
///
/// Created by `Binder::bind`. Cloning is cheap; clones share the transport
/// and logger but own their location and credential.
///
/// # Panics
/// The async operations hand the transport call to
/// `tokio::task::spawn_blocking`, so their futures must be polled inside a
/// Tokio runtime (any flavor). Polling one elsewhere panics. Callers without
/// a runtime can pair the `build_*` and `parse_*` halves with their own I/O.
#[derive(Clone)]
pub struct Reference {
    location: Location,
    auth: Option<String>,
    logger: Arc<dyn Logger>,
    transport: Arc<dyn Transport>,
}

impl Reference {
    pub(crate) fn new(
        location: Location,
        auth: Option<String>,
        logger: Arc<dyn Logger>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            location,
            auth,
            logger,
            transport,
        }
    }

    /// The bound URL without the `.json` marker.
    pub fn url(&self) -> String {
        self.location.to_string()
    }

    /// Re-point this reference at another absolute URL.
    pub fn set_url(&mut self, url: &str) -> Result<(), Error> {
        self.location = Location::parse_url(url)?;
        Ok(())
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn auth(&self) -> Option<&str> {
        self.auth.as_deref()
    }

    pub fn set_auth(&mut self, auth: Option<String>) {
        self.auth = auth;
    }

    // -----------------------------------------------------------------------
    // Request building
    // -----------------------------------------------------------------------

    fn request(&self, method: HttpMethod, url: String, query: Option<&Query>) -> HttpRequest {
        let query = query
            .map(|q| q.with_auth(self.auth()))
            .unwrap_or_else(|| Query::new().with_auth(self.auth()));
        HttpRequest {
            method,
            url,
            query,
            headers: Vec::new(),
            body: None,
        }
    }

    fn json_request<T: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        url: String,
        payload: &T,
        query: Option<&Query>,
    ) -> Result<HttpRequest, Error> {
        let body =
            serde_json::to_string(payload).map_err(|e| Error::Serialization(e.to_string()))?;
        let mut request = self.request(method, url, query);
        request.headers.push((JSON_CONTENT_TYPE.0.to_string(), JSON_CONTENT_TYPE.1.to_string()));
        request.body = Some(body);
        Ok(request)
    }

    pub fn build_get(&self, query: Option<&Query>) -> HttpRequest {
        self.request(HttpMethod::Get, self.location.leaf_url(), query)
    }

    pub fn build_set<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        query: Option<&Query>,
    ) -> Result<HttpRequest, Error> {
        self.json_request(HttpMethod::Put, self.location.leaf_url(), payload, query)
    }

    /// PATCH always addresses the directory form of the location, since an
    /// update merges named children rather than replacing a value.
    pub fn build_update<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        query: Option<&Query>,
    ) -> Result<HttpRequest, Error> {
        self.json_request(HttpMethod::Patch, self.location.directory_url(), payload, query)
    }

    pub fn build_push<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        query: Option<&Query>,
    ) -> Result<HttpRequest, Error> {
        self.json_request(HttpMethod::Post, self.location.leaf_url(), payload, query)
    }

    pub fn build_remove(&self, query: Option<&Query>) -> HttpRequest {
        self.request(HttpMethod::Delete, self.location.leaf_url(), query)
    }

    /// GET the rules document, or PUT `payload` verbatim when given.
    pub fn build_rules(&self, payload: Option<&str>) -> Result<HttpRequest, Error> {
        if self.auth.is_none() {
            return Err(Error::AuthMissing);
        }
        let url = self.location.rules_url();
        let request = match payload {
            None => self.request(HttpMethod::Get, url, None),
            Some(rules) => {
                let mut request = self.request(HttpMethod::Put, url, None);
                request.body = Some(rules.to_string());
                request
            }
        };
        Ok(request)
    }

    // -----------------------------------------------------------------------
    // Response parsing
    // -----------------------------------------------------------------------

    /// Report the auth-debug header and map status >= 300 to an error.
    fn check_status(&self, request: &HttpRequest, response: &HttpResponse) -> Result<(), Error> {
        let auth_debug = response.header(AUTH_DEBUG_HEADER).map(str::to_string);
        if let Some(message) = &auth_debug {
            self.logger.warn(message);
        }
        if response.status < 300 {
            return Ok(());
        }
        Err(ResponseError {
            url: request.url.clone(),
            method: request.method,
            status: response.status,
            auth_debug,
            body: lenient_json(&response.body),
        }
        .into())
    }

    /// Parse the response to a data operation. An empty body is `null`.
    pub fn parse_json(&self, request: &HttpRequest, response: HttpResponse) -> Result<Value, Error> {
        self.check_status(request, &response)?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Parse the response to a rules operation; the body is returned as is.
    pub fn parse_rules(&self, request: &HttpRequest, response: HttpResponse) -> Result<String, Error> {
        self.check_status(request, &response)?;
        Ok(response.body)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Panics outside a Tokio runtime; see the type-level docs.
    async fn dispatch(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        tracing::debug!(method = %request.method, url = %request.url, "dispatching request");
        let transport = Arc::clone(&self.transport);
        let owned = request.clone();
        let response = tokio::task::spawn_blocking(move || transport.execute(&owned))
            .await
            .map_err(|e| Error::Transport(Box::new(e)))?
            .map_err(Error::Transport)?;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            "response received"
        );
        Ok(response)
    }

    async fn process(&self, request: HttpRequest) -> Result<Value, Error> {
        let response = self.dispatch(&request).await?;
        self.parse_json(&request, response)
    }

    /// Read the value at this location.
    pub async fn get(&self, query: Option<&Query>) -> Result<Value, Error> {
        self.process(self.build_get(query)).await
    }

    /// Replace the value at this location.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        query: Option<&Query>,
    ) -> Result<Value, Error> {
        self.process(self.build_set(payload, query)?).await
    }

    /// Merge the children in `payload` into this location.
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        query: Option<&Query>,
    ) -> Result<Value, Error> {
        self.process(self.build_update(payload, query)?).await
    }

    /// Append `payload` under a server-generated key. The server answers
    /// with `{"name": "<key>"}`.
    pub async fn push<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        query: Option<&Query>,
    ) -> Result<Value, Error> {
        self.process(self.build_push(payload, query)?).await
    }

    /// Delete the value at this location.
    pub async fn remove(&self, query: Option<&Query>) -> Result<Value, Error> {
        self.process(self.build_remove(query)).await
    }

    /// Read the security rules, or replace them with `payload`. Fails with
    /// `Error::AuthMissing` before any I/O when no credential is set.
    pub async fn rules(&self, payload: Option<&str>) -> Result<String, Error> {
        let request = self.build_rules(payload)?;
        let response = self.dispatch(&request).await?;
        self.parse_rules(&request, response)
    }
}

/// The `.json`-normalized leaf URL.
impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location.leaf_url())
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("location", &self.location)
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

/// Error bodies are JSON when the server managed to produce JSON; anything
/// else is kept verbatim as a string.
fn lenient_json(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
