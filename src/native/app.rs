//! Application exit via the host's shutdown token.

use tokio_util::sync::CancellationToken;

use super::AppControl;

/// [`AppControl`] that cancels the host's shutdown token.
///
/// The serve loop watches the same token, so exit flushes pending
/// replies, stops accepting connections and removes the socket.
#[derive(Debug, Clone)]
pub struct ShutdownExit {
    token: CancellationToken,
}

impl ShutdownExit {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl AppControl for ShutdownExit {
    fn exit(&self) {
        tracing::info!("application exit requested");
        self.token.cancel();
    }
}
