//! Sink for auth-debug messages returned by the server.

use std::sync::Arc;

/// Receives the `x-firebase-auth-debug` header of every response.
pub trait Logger: Send + Sync {
    fn warn(&self, message: &str);
}

/// Forwards messages to `tracing` at WARN level. Used when a reference is
/// bound without an explicit logger.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "rtdb_core::auth_debug", "{message}");
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn warn(&self, _message: &str) {}
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn warn(&self, message: &str) {
        (**self).warn(message)
    }
}
