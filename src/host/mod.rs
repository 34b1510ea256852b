//! Host daemon — serves the platform channel on a Unix domain socket.
//!
//! Architecture: channel-based actor. A single host loop owns the
//! [`PlatformChannel`] dispatcher. Per-connection tasks forward
//! envelopes via an mpsc channel; replies travel back on a
//! per-connection sender, so a slow clipboard fetch never blocks
//! other calls.

mod connection;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use connection::{ConnectionId, HostCommand};

use crate::channel::{JsonMethodCodec, MethodResponse, MethodResult, PLATFORM_CHANNEL};
use crate::ipc::protocol::Envelope;
use crate::native::{ShutdownExit, XclipClipboardService};
use crate::platform::{ClipboardMode, PlatformChannel};

/// How long shutdown waits for connections to flush their replies.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Host startup/runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("$XDG_RUNTIME_DIR is not set")]
    NoRuntimeDir,
    #[error("host already running at {0}")]
    AlreadyRunning(PathBuf),
    #[error("socket path {0} has no parent directory")]
    NoParent(PathBuf),
    #[error("failed to create directory {path}: {source}")]
    MkdirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to bind socket {path}: {source}")]
    BindFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Host settings, resolved from the command line.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub socket_path: PathBuf,
    pub clipboard: ClipboardMode,
}

impl HostConfig {
    /// Build a config, defaulting the socket under `$XDG_RUNTIME_DIR`.
    pub fn resolve(socket: Option<PathBuf>, clipboard: ClipboardMode) -> Result<Self, HostError> {
        let socket_path = match socket {
            Some(path) => path,
            None => default_socket_path()?,
        };
        Ok(Self {
            socket_path,
            clipboard,
        })
    }
}

/// Run the host until SIGTERM, SIGINT or `SystemNavigator.pop`.
///
/// # Errors
///
/// Returns `HostError` if the socket cannot be bound or another host
/// is already running on it.
pub async fn run(config: HostConfig) -> Result<(), HostError> {
    let listener = bind_socket(&config.socket_path).await?;

    let shutdown = CancellationToken::new();
    let app = Arc::new(ShutdownExit::new(shutdown.clone()));
    let channel = match config.clipboard {
        ClipboardMode::Memory => PlatformChannel::with_memory_clipboard(app),
        ClipboardMode::System => {
            PlatformChannel::with_system_clipboard(app, Arc::new(XclipClipboardService::new()))
        }
    };
    tracing::info!(
        path = %config.socket_path.display(),
        clipboard = ?channel.mode(),
        "platform channel listening"
    );

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
            _ = signal_token.cancelled() => return,
        }
        signal_token.cancel();
    });

    serve(listener, channel, shutdown).await;

    if let Err(e) = std::fs::remove_file(&config.socket_path) {
        tracing::warn!(error = %e, path = %config.socket_path.display(), "failed to remove socket");
    }
    tracing::info!("host stopped");
    Ok(())
}

/// Accept connections and dispatch their calls until `shutdown` fires.
async fn serve(listener: UnixListener, mut channel: PlatformChannel, shutdown: CancellationToken) {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<HostCommand>();
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => accept_connection(
                        &mut connections,
                        stream,
                        &cmd_tx,
                        &shutdown,
                    ),
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                }
            }

            Some(cmd) = cmd_rx.recv() => dispatch(&mut channel, cmd),

            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!("connections still flushing at shutdown, aborting them");
        connections.abort_all();
    }
}

fn accept_connection(
    connections: &mut JoinSet<()>,
    stream: UnixStream,
    cmd_tx: &mpsc::UnboundedSender<HostCommand>,
    shutdown: &CancellationToken,
) {
    let conn_id = ConnectionId::new();
    connection::spawn_connection(
        connections,
        stream,
        conn_id,
        cmd_tx.clone(),
        shutdown.clone(),
    );
    tracing::debug!(?conn_id, "accepted connection");
}

/// Route one envelope to the dispatcher and arrange for its reply.
///
/// Synchronously answered calls are replied to immediately; calls still
/// pending (native clipboard fetches) are awaited on a spawned task.
fn dispatch(channel: &mut PlatformChannel, cmd: HostCommand) {
    let HostCommand { request, reply_tx } = cmd;

    if request.channel != PLATFORM_CHANNEL {
        tracing::debug!(channel = %request.channel, "no handler for channel");
        send_reply(&reply_tx, &request, &MethodResponse::NotImplemented);
        return;
    }

    let call = match JsonMethodCodec.decode_method_call(&request.payload) {
        Ok(call) => call,
        Err(e) => {
            tracing::warn!(id = request.id, error = %e, "malformed method call");
            send_reply(&reply_tx, &request, &MethodResponse::NotImplemented);
            return;
        }
    };

    let (result, mut response_rx) = MethodResult::new(call.method.clone());
    channel.handle_method_call(call, result);

    match response_rx.try_recv() {
        Ok(response) => send_reply(&reply_tx, &request, &response),
        Err(TryRecvError::Empty) => {
            tokio::spawn(async move {
                let response = response_rx.await.unwrap_or(MethodResponse::NotImplemented);
                send_reply(&reply_tx, &request, &response);
            });
        }
        Err(TryRecvError::Closed) => {
            send_reply(&reply_tx, &request, &MethodResponse::NotImplemented);
        }
    }
}

fn send_reply(
    reply_tx: &mpsc::UnboundedSender<Envelope>,
    request: &Envelope,
    response: &MethodResponse,
) {
    let payload = JsonMethodCodec.encode_response(response).unwrap_or_else(|e| {
        tracing::warn!(id = request.id, error = %e, "failed to encode response");
        Vec::new()
    });
    if reply_tx.send(request.reply(payload)).is_err() {
        tracing::debug!(id = request.id, "connection gone before reply");
    }
}

// -- Socket setup --

/// Resolve the default socket path from `$XDG_RUNTIME_DIR`.
pub fn default_socket_path() -> Result<PathBuf, HostError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").map_err(|_| HostError::NoRuntimeDir)?;
    Ok(PathBuf::from(runtime_dir)
        .join("platformd")
        .join("platform.sock"))
}

/// Create the socket directory and bind the Unix listener.
///
/// Handles stale socket detection: if EADDRINUSE, attempts to connect
/// to the existing socket. If the connection succeeds, another host
/// is running. If it fails, the socket is stale and is removed.
async fn bind_socket(path: &Path) -> Result<UnixListener, HostError> {
    let parent = path
        .parent()
        .ok_or_else(|| HostError::NoParent(path.to_path_buf()))?;
    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(|e| HostError::MkdirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    // Enforced even when the directory already existed.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700)).map_err(|e| {
            HostError::MkdirFailed {
                path: parent.to_path_buf(),
                source: e,
            }
        })?;
    }

    match UnixListener::bind(path) {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => match UnixStream::connect(path).await {
            Ok(_) => Err(HostError::AlreadyRunning(path.to_path_buf())),
            Err(_) => {
                tracing::info!(path = %path.display(), "removing stale socket");
                std::fs::remove_file(path).map_err(|e| HostError::BindFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                UnixListener::bind(path).map_err(|e| HostError::BindFailed {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        },
        Err(e) => Err(HostError::BindFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
