//! Clipboard handlers for `Clipboard.getData` / `Clipboard.setData`.
//!
//! Two variants:
//! - [`MemoryClipboard`]: a process-local string, last writer wins.
//! - [`SystemClipboard`]: reads the native clipboard asynchronously,
//!   one fetch at a time. A second read while one is outstanding is
//!   rejected, not queued.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::channel::MethodResult;
use crate::native::{ClipboardService, ClipboardSession, NativeError};

/// Key holding clipboard text in argument and result documents.
pub const TEXT_KEY: &str = "text";
/// The only clipboard format the channel supports.
pub const TEXT_PLAIN_FORMAT: &str = "text/plain";

/// Error code for an unsupported format argument.
pub const UNKNOWN_CLIPBOARD_FORMAT_ERROR: &str = "Unknown clipboard format error";
/// Error code for every other clipboard failure.
pub const UNKNOWN_CLIPBOARD_ERROR: &str = "Unknown error during clipboard data retrieval";

const ONLY_TEXT_MESSAGE: &str = "Clipboard API only supports text.";
const INVALID_FORMAT_MESSAGE: &str = "Invalid message format";
const BUSY_MESSAGE: &str = "Already processing a clipboard request.";
const OPEN_FAILED_MESSAGE: &str = "Failed to open the clipboard service.";
const EMPTY_MESSAGE: &str = "No clipboard data available.";
const SUBMIT_FAILED_MESSAGE: &str = "Failed to request clipboard data.";
const FETCH_FAILED_MESSAGE: &str = "Clipboard data retrieval failed.";

/// Whether the `getData` argument names the `text/plain` format.
///
/// The format normally arrives as a bare string; a one-element array
/// holding that string is accepted as well.
pub fn is_text_plain(args: &Value) -> bool {
    let format = match args {
        Value::String(format) => Some(format.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        _ => None,
    };
    format == Some(TEXT_PLAIN_FORMAT)
}

fn text_payload(text: String) -> Value {
    let mut document = Map::new();
    document.insert(TEXT_KEY.into(), Value::String(text));
    Value::Object(document)
}

/// In-process clipboard backed by a single string.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: String,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn get_data(&self, args: &Value, result: MethodResult) {
        if !is_text_plain(args) {
            result.error(UNKNOWN_CLIPBOARD_FORMAT_ERROR, ONLY_TEXT_MESSAGE);
            return;
        }
        result.success(Some(text_payload(self.text.clone())));
    }

    pub fn set_data(&mut self, args: &Value, result: MethodResult) {
        match args.get(TEXT_KEY).and_then(Value::as_str) {
            Some(text) => {
                self.text = text.to_string();
                result.success(None);
            }
            None => result.error(UNKNOWN_CLIPBOARD_ERROR, INVALID_FORMAT_MESSAGE),
        }
    }
}

/// Single-flight gate for native clipboard fetches.
///
/// Cloning shares the flag. The flag is held by a [`FetchGuard`] and
/// cleared when the guard drops, whichever path the fetch leaves by.
#[derive(Debug, Clone, Default)]
pub struct FetchGate {
    in_flight: Arc<Mutex<bool>>,
}

impl FetchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or `None` if a fetch is already outstanding.
    pub fn try_begin(&self) -> Option<FetchGuard> {
        let mut in_flight = self.in_flight.lock();
        if *in_flight {
            return None;
        }
        *in_flight = true;
        Some(FetchGuard {
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        *self.in_flight.lock()
    }
}

/// Proof of an outstanding fetch. Dropping it reopens the gate.
#[derive(Debug)]
pub struct FetchGuard {
    in_flight: Arc<Mutex<bool>>,
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        *self.in_flight.lock() = false;
    }
}

/// An accepted fetch, from the moment the session opens until the
/// result is resolved.
///
/// Owned by the fetch task and consumed exactly once, by either
/// [`PendingFetch::fail`] or [`PendingFetch::complete`].
#[derive(Debug)]
struct PendingFetch {
    result: MethodResult,
    guard: FetchGuard,
}

impl PendingFetch {
    fn fail(self, message: &str) {
        let PendingFetch { result, guard } = self;
        drop(guard);
        result.error(UNKNOWN_CLIPBOARD_ERROR, message);
    }

    fn complete(self, outcome: Result<Result<String, NativeError>, oneshot::error::RecvError>) {
        match outcome {
            Ok(Ok(text)) => {
                let PendingFetch { result, guard } = self;
                drop(guard);
                result.success(Some(text_payload(text)));
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "clipboard fetch failed");
                self.fail(FETCH_FAILED_MESSAGE);
            }
            Err(_) => {
                tracing::warn!("clipboard service dropped the request without replying");
                self.fail(FETCH_FAILED_MESSAGE);
            }
        }
    }

    /// Count items, submit the request and await the reply.
    ///
    /// The count query may block on the selection owner, so it runs on
    /// the blocking pool rather than the dispatcher's worker.
    async fn run(self, session: Box<dyn ClipboardSession>) {
        let counted = tokio::task::spawn_blocking(move || {
            let count = session.item_count();
            (session, count)
        })
        .await;

        let session = match counted {
            Ok((_, Ok(0))) => return self.fail(EMPTY_MESSAGE),
            Ok((session, Ok(count))) => {
                tracing::debug!(count, "clipboard items available");
                session
            }
            Ok((_, Err(e))) => {
                tracing::warn!(error = %e, "failed to query clipboard item count");
                return self.fail(EMPTY_MESSAGE);
            }
            Err(e) => {
                tracing::warn!(error = %e, "clipboard item count task failed");
                return self.fail(EMPTY_MESSAGE);
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if let Err(e) = session.request_text(reply_tx) {
            tracing::warn!(error = %e, "failed to submit clipboard request");
            return self.fail(SUBMIT_FAILED_MESSAGE);
        }

        self.complete(reply_rx.await);
    }
}

/// Native clipboard reader with a single-flight guard.
pub struct SystemClipboard {
    service: Arc<dyn ClipboardService>,
    gate: FetchGate,
}

impl SystemClipboard {
    pub fn new(service: Arc<dyn ClipboardService>) -> Self {
        Self {
            service,
            gate: FetchGate::new(),
        }
    }

    #[cfg(test)]
    pub fn is_fetching(&self) -> bool {
        self.gate.is_busy()
    }

    /// Start a native fetch. The result is resolved here when the call
    /// is rejected up front, otherwise by the fetch task. Nothing here
    /// waits on the clipboard owner.
    pub fn get_data(&self, args: &Value, result: MethodResult) {
        if !is_text_plain(args) {
            result.error(UNKNOWN_CLIPBOARD_FORMAT_ERROR, ONLY_TEXT_MESSAGE);
            return;
        }

        // TODO: queue concurrent reads instead of rejecting them.
        let Some(guard) = self.gate.try_begin() else {
            tracing::warn!("clipboard fetch already in progress");
            result.error(UNKNOWN_CLIPBOARD_ERROR, BUSY_MESSAGE);
            return;
        };

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(error = %e, "no runtime to await the clipboard reply");
                result.error(UNKNOWN_CLIPBOARD_ERROR, SUBMIT_FAILED_MESSAGE);
                return;
            }
        };

        let session = match self.service.open() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "failed to open clipboard service");
                result.error(UNKNOWN_CLIPBOARD_ERROR, OPEN_FAILED_MESSAGE);
                return;
            }
        };

        let pending = PendingFetch { result, guard };
        runtime.spawn(pending.run(session));
    }
}
