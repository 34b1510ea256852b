//! X11 clipboard service — read via `xclip -selection clipboard`.
//!
//! `item_count` lists the selection's `TARGETS`; `request_text` spawns
//! `xclip -o` and completes on a tokio task once the child exits.

use std::process::Stdio;

use tokio::process::Command;
use tokio::runtime::Handle;

use super::{ClipboardService, ClipboardSession, NativeError, TextReply};

/// `xclip`-backed [`ClipboardService`].
#[derive(Debug, Default)]
pub struct XclipClipboardService;

impl XclipClipboardService {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardService for XclipClipboardService {
    fn open(&self) -> Result<Box<dyn ClipboardSession>, NativeError> {
        if std::env::var_os("DISPLAY").is_none() {
            return Err(NativeError::Open("DISPLAY is not set".into()));
        }
        let runtime = Handle::try_current()
            .map_err(|e| NativeError::Open(format!("no tokio runtime: {e}")))?;
        Ok(Box::new(XclipSession { runtime }))
    }
}

struct XclipSession {
    runtime: Handle,
}

impl ClipboardSession for XclipSession {
    fn item_count(&self) -> Result<usize, NativeError> {
        let output = std::process::Command::new("xclip")
            .args(["-selection", "clipboard", "-t", "TARGETS", "-o"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| NativeError::Query(format!("failed to spawn xclip: {e}")))?;

        // xclip exits non-zero when nobody owns the selection.
        if !output.status.success() {
            return Ok(0);
        }
        Ok(count_targets(&String::from_utf8_lossy(&output.stdout)))
    }

    fn request_text(self: Box<Self>, reply: TextReply) -> Result<(), NativeError> {
        let runtime = self.runtime.clone();
        let _enter = runtime.enter();
        let child = Command::new("xclip")
            .args(["-selection", "clipboard", "-o"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NativeError::Submit(format!("failed to spawn xclip -o: {e}")))?;

        runtime.spawn(async move {
            let outcome = match child.wait_with_output().await {
                Ok(output) if output.status.success() => String::from_utf8(output.stdout)
                    .map_err(|e| NativeError::Fetch(format!("clipboard is not UTF-8: {e}"))),
                Ok(output) => Err(NativeError::Fetch(format!(
                    "xclip -o exited with status {}",
                    output.status
                ))),
                Err(e) => Err(NativeError::Fetch(format!("failed to wait for xclip: {e}"))),
            };
            if reply.send(outcome).is_err() {
                tracing::debug!("clipboard reply receiver dropped");
            }
            // Session closes here, after the reply.
            drop(self);
        });
        Ok(())
    }
}

/// Count the non-empty lines of an `xclip -t TARGETS` listing.
fn count_targets(listing: &str) -> usize {
    listing.lines().filter(|line| !line.trim().is_empty()).count()
}
