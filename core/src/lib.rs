//! REST binding for a hierarchical JSON document database.
//!
//! # Overview
//! `factory` validates a database identifier or root URL and returns a
//! `Binder`; the binder hands out `Reference`s to paths in the tree. Each
//! reference reads and writes its path with one HTTP request per operation
//! (`get`, `set`, `update`, `push`, `remove`) and can read or replace the
//! database's security rules (`rules`).
//!
//! ```no_run
//! # async fn demo() -> Result<(), rtdb_core::Error> {
//! use rtdb_core::{factory, BindOptions, Query};
//! use serde_json::json;
//!
//! let db = factory("my-app")?;
//! let users = db.bind(BindOptions::new().path("users").auth("token"));
//! users.update(&json!({"ada": {"born": 1815}}), None).await?;
//! let first = users.get(Some(&Query::new().order_by_key().limit_to_first(1))).await?;
//! # let _ = first;
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - Addresses are parsed `Location`s; the `.json` dispatch URL is rendered
//!   from them, with PATCH always going to the `/.json` directory form.
//! - Each operation has a pure `build_*` / `parse_*` pair; the async methods
//!   run the transport in between on tokio's blocking pool.
//! - Status >= 300 becomes `Error::Response`, carrying the request URL,
//!   method, status, auth-debug header and body.

pub mod error;
pub mod factory;
pub mod http;
pub mod logger;
pub mod query;
pub mod reference;
pub mod target;
pub mod transport;

pub use error::{Error, ResponseError, TransportError};
pub use factory::{factory, BindOptions, Binder};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use query::Query;
pub use reference::{Reference, AUTH_DEBUG_HEADER};
pub use target::{Location, RootTarget, DEFAULT_DOMAIN};
pub use transport::{Transport, UreqTransport, REQUEST_TIMEOUT};
