//! One-shot CLI client for the platform channel.
//!
//! Connects to a running host, sends a single method call on
//! `flutter/platform`, prints the decoded response, and exits.

use std::path::{Path, PathBuf};

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::UnixStream;
use tokio_util::codec::Framed;

use crate::channel::{
    JsonMethodCodec, MethodCall, MethodCodecError, MethodResponse, PLATFORM_CHANNEL,
};
use crate::host::{HostError, default_socket_path};
use crate::ipc::codec::{CodecError, EnvelopeCodec};
use crate::ipc::protocol::Envelope;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("host: {0}")]
    Host(String),
    #[error("invalid --args JSON: {0}")]
    Args(#[from] serde_json::Error),
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
    #[error("method codec: {0}")]
    MethodCodec(#[from] MethodCodecError),
    #[error(transparent)]
    Socket(#[from] HostError),
}

/// Send `method` with `args` (JSON text) and print the response.
pub async fn run(
    socket: Option<PathBuf>,
    method: String,
    args: Option<String>,
) -> Result<(), ClientError> {
    let call = MethodCall::new(method, parse_args(args.as_deref())?);
    let socket_path = match socket {
        Some(path) => path,
        None => default_socket_path()?,
    };

    let response = invoke(&socket_path, &call).await?;
    println!("{}", format_response(&response));
    Ok(())
}

fn parse_args(args: Option<&str>) -> Result<Value, ClientError> {
    match args {
        Some(text) => Ok(serde_json::from_str(text)?),
        None => Ok(Value::Null),
    }
}

async fn invoke(socket_path: &Path, call: &MethodCall) -> Result<MethodResponse, ClientError> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| ClientError::Host(format!("connect {}: {e}", socket_path.display())))?;
    let mut framed = Framed::new(stream, EnvelopeCodec::new());

    let request = Envelope {
        id: 1,
        channel: PLATFORM_CHANNEL.into(),
        payload: JsonMethodCodec.encode_method_call(call)?,
    };
    framed.send(request).await?;

    match framed.next().await {
        Some(Ok(reply)) if reply.id == 1 => Ok(JsonMethodCodec.decode_response(&reply.payload)?),
        Some(Ok(reply)) => Err(ClientError::Host(format!(
            "reply for unexpected id {}",
            reply.id
        ))),
        Some(Err(e)) => Err(e.into()),
        None => Err(ClientError::Host("connection closed before reply".into())),
    }
}

fn format_response(response: &MethodResponse) -> String {
    match response {
        MethodResponse::Success(None) => "success".to_string(),
        MethodResponse::Success(Some(payload)) => format!("success: {payload}"),
        MethodResponse::Error { code, message, .. } => format!("error: {code}: {message}"),
        MethodResponse::NotImplemented => "not implemented".to_string(),
    }
}
