//! Method channel types — calls, responses, and the one-shot result sink.
//!
//! A [`MethodCall`] arrives decoded by [`codec::JsonMethodCodec`]; the
//! handler answers through a [`MethodResult`], which yields exactly one
//! [`MethodResponse`].

pub mod codec;
pub mod result;

use serde_json::Value;

pub use codec::{JsonMethodCodec, MethodCodecError};
pub use result::MethodResult;

/// Name of the channel carrying platform method calls.
pub const PLATFORM_CHANNEL: &str = "flutter/platform";

/// A single method invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    /// Loosely typed arguments. `Value::Null` when the caller sent none.
    pub args: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, args: Value) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

/// The three possible outcomes of a method call.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Option<Value>),
    Error {
        code: String,
        message: String,
        details: Option<Value>,
    },
    NotImplemented,
}

impl MethodResponse {
    /// Shorthand used by handlers and tests.
    pub fn error(code: &str, message: &str) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }
}
