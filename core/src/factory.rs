//! Binds a database root and hands out references into it.

use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::logger::{Logger, TracingLogger};
use crate::reference::Reference;
use crate::target::{Location, RootTarget, DEFAULT_DOMAIN};
use crate::transport::{Transport, UreqTransport};

/// Validate `target` and return a binder for it.
///
/// `target` is either a database identifier (`[A-Za-z0-9-]{2,}`), served
/// from `https://{target}.firebaseio.com`, or an absolute
/// `http(s)://host[:port]` URL with no path.
pub fn factory(target: &str) -> Result<Binder, Error> {
    Binder::new(target)
}

/// Options for `Binder::bind`. Every field is optional:
/// no path addresses the root, no auth sends no credential, and no logger
/// means `TracingLogger`.
#[derive(Clone, Default)]
pub struct BindOptions {
    paths: Vec<String>,
    auth: Option<String>,
    logger: Option<Arc<dyn Logger>>,
}

impl BindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one path, which may contain `/`.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Append a sequence of path segments.
    pub fn paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        let logger: Arc<dyn Logger> = Arc::new(logger);
        self.logger = Some(logger);
        self
    }
}

impl fmt::Debug for BindOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindOptions")
            .field("paths", &self.paths)
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .field("logger", &self.logger.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

/// A validated database root. Cheap to clone; every reference it binds shares
/// its transport.
#[derive(Clone)]
pub struct Binder {
    root: String,
    transport: Arc<dyn Transport>,
}

impl Binder {
    pub fn new(target: &str) -> Result<Self, Error> {
        Self::with_domain(target, DEFAULT_DOMAIN)
    }

    /// Like `new`, but identifier targets resolve under `domain`.
    pub fn with_domain(target: &str, domain: &str) -> Result<Self, Error> {
        let root = RootTarget::parse(target)?.root_url(domain);
        tracing::debug!(%root, "bound database root");
        Ok(Self {
            root,
            transport: Arc::new(UreqTransport::new()),
        })
    }

    /// Replace the transport used by references bound from now on.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// The root URL, without a trailing `/`.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn bind(&self, options: BindOptions) -> Reference {
        let BindOptions {
            paths,
            auth,
            logger,
        } = options;
        Reference::new(
            Location::new(&self.root, paths),
            auth,
            logger.unwrap_or_else(|| Arc::new(TracingLogger) as Arc<dyn Logger>),
            Arc::clone(&self.transport),
        )
    }

    /// Shorthand for binding `path` with no credential.
    pub fn reference(&self, path: impl Into<String>) -> Reference {
        self.bind(BindOptions::new().path(path))
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
