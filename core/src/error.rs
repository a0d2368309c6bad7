//! Error types for the database binding.
//!
//! # Design
//! Construction failures come back synchronously from `factory`; everything
//! else is the error half of an operation's future. `ResponseError` gets its
//! own struct because callers inspect its fields (status, body, auth-debug)
//! rather than just printing it. Transport failures keep the transport's own
//! error as the source so callers can downcast to it.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::http::HttpMethod;

/// Boxed error produced by a `Transport` before any response arrived.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by the factory and by `Reference` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The root target is neither a valid identifier nor an absolute
    /// `http(s)://host[:port]` URL.
    #[error("invalid identifier: {0:?}")]
    InvalidTarget(String),

    /// A URL handed to `Reference::set_url` is not an absolute http(s) URL.
    #[error("invalid url: {0:?}")]
    InvalidUrl(String),

    /// No response was received (timeout, DNS, connection refused).
    #[error("transport failure: {0}")]
    Transport(#[source] TransportError),

    /// The server answered with a status code >= 300.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// `rules` was called on a reference without an auth credential.
    #[error("reading or writing rules requires an auth credential")]
    AuthMissing,

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A successful response body was not valid JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl Error {
    /// The HTTP status carried by a `Response` error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Response(err) => Some(err.status),
            _ => None,
        }
    }
}

/// A non-success response, with enough context to tell which request failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseError {
    pub url: String,
    pub method: HttpMethod,
    pub status: u16,
    /// Value of the `x-firebase-auth-debug` response header.
    pub auth_debug: Option<String>,
    /// Parsed JSON body; a body that is not JSON is kept as a JSON string,
    /// an empty body is `null`.
    pub body: Value,
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} failed with HTTP {}", self.method, self.url, self.status)?;
        if let Some(message) = self.body.get("error").and_then(Value::as_str) {
            write!(f, ": {message}")?;
        }
        if let Some(debug) = &self.auth_debug {
            write!(f, " (auth debug: {debug})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ResponseError {}
