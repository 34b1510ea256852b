//! Native collaborators — the OS services the platform channel calls out to.
//!
//! The dispatcher only ever sees these traits. Real adapters live in
//! [`app`] and [`xclip`]; tests substitute their own implementations.

pub mod app;
pub mod xclip;

use tokio::sync::oneshot;

pub use app::ShutdownExit;
pub use xclip::XclipClipboardService;

/// Errors returned by native adapters.
#[derive(Debug, thiserror::Error)]
pub enum NativeError {
    /// The clipboard service could not be opened (e.g. no display).
    #[error("open: {0}")]
    Open(String),

    /// Querying the clipboard item count failed.
    #[error("query: {0}")]
    Query(String),

    /// The asynchronous selection request could not be submitted.
    #[error("submit: {0}")]
    Submit(String),

    /// The selection request completed with a failure.
    #[error("fetch: {0}")]
    Fetch(String),
}

/// Completion channel for an asynchronous selection request.
///
/// Sent exactly once by the adapter, from whatever thread or task the
/// underlying service completes on.
pub type TextReply = oneshot::Sender<Result<String, NativeError>>;

/// Application lifecycle primitive.
pub trait AppControl: Send + Sync {
    /// Ask the application to terminate. Returns immediately; the host
    /// winds down after the current call has been answered.
    fn exit(&self);
}

/// Entry point to the system clipboard.
///
/// `Send + Sync` because the service is shared with the dispatcher,
/// which may be driven from any runtime worker.
pub trait ClipboardService: Send + Sync {
    /// Open a clipboard session. Dropping the session closes it.
    fn open(&self) -> Result<Box<dyn ClipboardSession>, NativeError>;
}

/// An open clipboard session.
pub trait ClipboardSession: Send {
    /// Number of items currently on the clipboard.
    fn item_count(&self) -> Result<usize, NativeError>;

    /// Start fetching the clipboard text.
    ///
    /// The session moves into the request and stays open until the
    /// outcome has been sent on `reply`. An `Err` means nothing was
    /// submitted and `reply` has been dropped unused.
    fn request_text(self: Box<Self>, reply: TextReply) -> Result<(), NativeError>;
}
