//! One-shot result sink for a method call.
//!
//! Every resolving method consumes the sink, so a handler can answer
//! at most once. A sink dropped unresolved is a handler bug: it is
//! logged and answered with not-implemented so the caller never hangs.

use serde_json::Value;
use tokio::sync::oneshot;

use super::MethodResponse;

/// Write-once reply handle handed to a method handler.
#[derive(Debug)]
pub struct MethodResult {
    method: String,
    reply: Option<oneshot::Sender<MethodResponse>>,
}

impl MethodResult {
    /// Create a sink for `method` and the receiver its response arrives on.
    pub fn new(method: impl Into<String>) -> (Self, oneshot::Receiver<MethodResponse>) {
        let (tx, rx) = oneshot::channel();
        let sink = Self {
            method: method.into(),
            reply: Some(tx),
        };
        (sink, rx)
    }

    pub fn success(self, payload: Option<Value>) {
        self.resolve(MethodResponse::Success(payload));
    }

    pub fn error(self, code: &str, message: &str) {
        self.resolve(MethodResponse::error(code, message));
    }

    pub fn not_implemented(self) {
        self.resolve(MethodResponse::NotImplemented);
    }

    fn resolve(mut self, response: MethodResponse) {
        if let Some(tx) = self.reply.take() {
            if tx.send(response).is_err() {
                tracing::debug!(method = %self.method, "caller went away before the response");
            }
        }
    }
}

impl Drop for MethodResult {
    fn drop(&mut self) {
        if let Some(tx) = self.reply.take() {
            tracing::error!(method = %self.method, "method result dropped without a response");
            let _ = tx.send(MethodResponse::NotImplemented);
        }
    }
}
