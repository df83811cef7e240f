//! Decoded HTTP message model delivered by the proxy pipeline.
//!
//! The sink never parses raw bytes off the wire; the dispatch layer hands it
//! already-decoded heads plus any streamed body chunks. `chunked` marks a
//! message whose body arrives as a chunk sequence terminated by a final
//! marker chunk rather than as one complete `body` buffer.

use std::fmt;

use serde::{Deserialize, Serialize};
use shadowcap_error::{CaptureError, Result};

use crate::flow::FlowDirection;

/// Protocol version of a decoded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpVersion {
    /// HTTP/1.0
    Http10,
    /// HTTP/1.1
    Http11,
    /// HTTP/2
    H2,
}

impl HttpVersion {
    /// Canonical display string (`HTTP/1.1` etc.).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
            Self::H2 => "HTTP/2",
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded request head with its (possibly empty) aggregated body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHead {
    /// Request method verbatim (`GET`, `POST`, ...).
    pub method: String,
    /// Request target as received (origin-form or absolute-form).
    pub target: String,
    /// Protocol version.
    pub version: HttpVersion,
    /// Header fields in arrival order; names may repeat.
    pub headers: Vec<(String, String)>,
    /// Aggregated body bytes for non-streamed messages.
    pub body: Vec<u8>,
    /// True when the body is delivered as a terminated chunk sequence.
    pub chunked: bool,
}

/// Decoded response head with its (possibly empty) aggregated body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHead {
    /// Status code.
    pub status: u16,
    /// Protocol version.
    pub version: HttpVersion,
    /// Header fields in arrival order; names may repeat.
    pub headers: Vec<(String, String)>,
    /// Aggregated body bytes for non-streamed messages.
    pub body: Vec<u8>,
    /// True when the body is delivered as a terminated chunk sequence.
    pub chunked: bool,
}

/// Either half of a decoded HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMessage {
    /// Client-to-server message.
    Request(RequestHead),
    /// Server-to-client message.
    Response(ResponseHead),
}

impl HttpMessage {
    /// Direction implied by the message variant.
    #[must_use]
    pub const fn direction(&self) -> FlowDirection {
        match self {
            Self::Request(_) => FlowDirection::Request,
            Self::Response(_) => FlowDirection::Response,
        }
    }

    /// True when the message body streams as chunks.
    #[must_use]
    pub const fn is_chunked(&self) -> bool {
        match self {
            Self::Request(head) => head.chunked,
            Self::Response(head) => head.chunked,
        }
    }

    /// Borrow the request head, or fail with an internal-consistency error.
    pub fn as_request(&self) -> Result<&RequestHead> {
        match self {
            Self::Request(head) => Ok(head),
            Self::Response(_) => Err(CaptureError::internal(
                "expected a request message, found a response",
            )),
        }
    }

    /// Borrow the response head, or fail with an internal-consistency error.
    pub fn as_response(&self) -> Result<&ResponseHead> {
        match self {
            Self::Response(head) => Ok(head),
            Self::Request(_) => Err(CaptureError::internal(
                "expected a response message, found a request",
            )),
        }
    }
}

/// One streamed body fragment of a chunked message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Fragment payload bytes.
    pub payload: Vec<u8>,
    /// True only on the terminal marker chunk.
    pub last: bool,
}

impl Chunk {
    /// Intermediate (non-terminal) chunk.
    #[must_use]
    pub fn data(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            last: false,
        }
    }

    /// Terminal chunk carrying the final payload (possibly empty).
    #[must_use]
    pub fn terminal(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            last: true,
        }
    }
}
