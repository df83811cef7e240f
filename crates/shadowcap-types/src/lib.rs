//! Core type definitions for the shadowcap capture sink.
//!
//! Shared vocabulary consumed by every other crate in the workspace: flow
//! identities, the decoded HTTP message model, the persisted document schema,
//! and the configuration/session surface.

pub mod clock;
pub mod config;
pub mod document;
pub mod flow;
pub mod message;

pub use clock::unix_millis;
pub use config::{CaptureConfig, RequestId, SessionId};
pub use document::{
    CaptureDocument, CookiePair, HeaderField, HeaderValue, RequestDocument, ResponseDocument,
};
pub use flow::{FlowDirection, FlowIdentity, FlowOrigin};
pub use message::{Chunk, HttpMessage, HttpVersion, RequestHead, ResponseHead};
