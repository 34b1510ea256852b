//! Platform method dispatcher for the `flutter/platform` channel.
//!
//! Pure dispatch — no transport. [`PlatformChannel::handle_method_call`]
//! answers every call exactly once through its [`MethodResult`]; native
//! failures become error results, never panics.

pub mod clipboard;

use std::sync::Arc;

use crate::channel::{MethodCall, MethodResult};
use crate::native::{AppControl, ClipboardService};

use clipboard::{MemoryClipboard, SystemClipboard};

/// `SystemChrome.*` methods the embedder acknowledges but does not implement.
pub const SYSTEM_CHROME_METHODS: [&str; 5] = [
    "SystemChrome.setPreferredOrientations",
    "SystemChrome.setApplicationSwitcherDescription",
    "SystemChrome.setEnabledSystemUIOverlays",
    "SystemChrome.restoreSystemUIOverlays",
    "SystemChrome.setSystemUIOverlayStyle",
];

/// Which clipboard backs `Clipboard.*` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ClipboardMode {
    /// Process-local string; `setData` supported.
    Memory,
    /// Native clipboard via `xclip`; read-only.
    System,
}

enum ClipboardBackend {
    Memory(MemoryClipboard),
    System(SystemClipboard),
}

/// Dispatcher for platform method calls.
///
/// Owned by the host loop; clipboard state lives here rather than in
/// globals so each instance is independent.
pub struct PlatformChannel {
    app: Arc<dyn AppControl>,
    clipboard: ClipboardBackend,
}

impl PlatformChannel {
    pub fn with_memory_clipboard(app: Arc<dyn AppControl>) -> Self {
        Self {
            app,
            clipboard: ClipboardBackend::Memory(MemoryClipboard::new()),
        }
    }

    pub fn with_system_clipboard(
        app: Arc<dyn AppControl>,
        service: Arc<dyn ClipboardService>,
    ) -> Self {
        Self {
            app,
            clipboard: ClipboardBackend::System(SystemClipboard::new(service)),
        }
    }

    pub fn mode(&self) -> ClipboardMode {
        match self.clipboard {
            ClipboardBackend::Memory(_) => ClipboardMode::Memory,
            ClipboardBackend::System(_) => ClipboardMode::System,
        }
    }

    pub fn handle_method_call(&mut self, call: MethodCall, result: MethodResult) {
        let method = call.method.as_str();
        tracing::trace!(method, "platform method call");

        match method {
            "SystemNavigator.pop" => {
                self.app.exit();
                result.success(None);
            }
            "SystemSound.play" | "HapticFeedback.vibrate" => result.not_implemented(),
            "Clipboard.getData" => match &self.clipboard {
                ClipboardBackend::Memory(clipboard) => clipboard.get_data(&call.args, result),
                ClipboardBackend::System(clipboard) => clipboard.get_data(&call.args, result),
            },
            "Clipboard.setData" => match &mut self.clipboard {
                ClipboardBackend::Memory(clipboard) => clipboard.set_data(&call.args, result),
                ClipboardBackend::System(_) => result.not_implemented(),
            },
            m if SYSTEM_CHROME_METHODS.iter().any(|chrome| *chrome == m) => result.not_implemented(),
            _ => {
                tracing::info!(method, "unimplemented method");
                result.not_implemented();
            }
        }
    }
}
