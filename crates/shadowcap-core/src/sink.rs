//! Sink factory: the glue between the proxy pipeline and the capture core.
//!
//! The factory holds configuration, session identity, and the dispatcher
//! handle — nothing per-request. `create` builds one [`CaptureRecord`] per
//! request identifier and wraps it in a [`CaptureSink`] implementing the
//! generic multi-flow sink contract. Fan-out to additional capture backends
//! is the proxy's concern; this sink captures to exactly one store.

use std::sync::Arc;

use shadowcap_error::Result;
use shadowcap_types::{
    CaptureConfig, Chunk, FlowDirection, FlowIdentity, FlowOrigin, HttpMessage, RequestHead,
    RequestId, ResponseHead, SessionId,
};
use tracing::info;

use crate::dispatch::PersistenceDispatcher;
use crate::record::{CaptureRecord, SubmitOutcome};

/// Generic multi-flow sink contract consumed by the proxy pipeline.
///
/// The four methods are the four event kinds; the direction half of the flow
/// identity is implied by the method, so callers only tag the origin.
/// Synchronous faults surface to the pipeline caller, which decides whether
/// to tear the connection down.
pub trait FlowEventSink {
    /// A decoded request head arrived on `origin`.
    fn on_request(&self, origin: FlowOrigin, message: RequestHead) -> Result<()>;
    /// A request body chunk arrived on `origin`.
    fn on_request_chunk(&self, origin: FlowOrigin, chunk: Chunk) -> Result<()>;
    /// A decoded response head arrived on `origin`.
    fn on_response(&self, origin: FlowOrigin, message: ResponseHead) -> Result<()>;
    /// A response body chunk arrived on `origin`.
    fn on_response_chunk(&self, origin: FlowOrigin, chunk: Chunk) -> Result<()>;
}

/// Creates one capture sink per proxied request.
pub struct CaptureSinkFactory {
    config: CaptureConfig,
    session: SessionId,
    dispatcher: Arc<PersistenceDispatcher>,
}

impl CaptureSinkFactory {
    /// Bind configuration and the persistence dispatcher. The session
    /// identity is the dispatcher's; there is exactly one per process.
    #[must_use]
    pub fn new(config: CaptureConfig, dispatcher: Arc<PersistenceDispatcher>) -> Self {
        let session = dispatcher.session().clone();
        info!(
            session_id = %session,
            shadowing = config.shadowing,
            "capture sink factory ready"
        );
        Self {
            config,
            session,
            dispatcher,
        }
    }

    /// Session identity threaded through every persisted document.
    #[must_use]
    pub const fn session(&self) -> &SessionId {
        &self.session
    }

    /// Build the sink for one request identifier.
    #[must_use]
    pub fn create(&self, request_id: RequestId) -> CaptureSink {
        CaptureSink {
            record: Arc::new(CaptureRecord::new(request_id, self.config.shadowing)),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

/// Per-request sink handle delegating to the record's state machine.
pub struct CaptureSink {
    record: Arc<CaptureRecord>,
    dispatcher: Arc<PersistenceDispatcher>,
}

impl CaptureSink {
    /// The underlying record, for lifecycle bookkeeping by the embedder.
    #[must_use]
    pub fn record(&self) -> &Arc<CaptureRecord> {
        &self.record
    }

    fn submit_message(&self, flow: FlowIdentity, message: HttpMessage) -> Result<()> {
        if self.record.submit_message(flow, message)? == SubmitOutcome::Completed {
            self.dispatcher.dispatch(Arc::clone(&self.record));
        }
        Ok(())
    }

    fn submit_chunk(&self, flow: FlowIdentity, chunk: Chunk) -> Result<()> {
        if self.record.submit_chunk(flow, chunk)? == SubmitOutcome::Completed {
            self.dispatcher.dispatch(Arc::clone(&self.record));
        }
        Ok(())
    }
}

impl FlowEventSink for CaptureSink {
    fn on_request(&self, origin: FlowOrigin, message: RequestHead) -> Result<()> {
        self.submit_message(
            FlowIdentity::new(origin, FlowDirection::Request),
            HttpMessage::Request(message),
        )
    }

    fn on_request_chunk(&self, origin: FlowOrigin, chunk: Chunk) -> Result<()> {
        self.submit_chunk(FlowIdentity::new(origin, FlowDirection::Request), chunk)
    }

    fn on_response(&self, origin: FlowOrigin, message: ResponseHead) -> Result<()> {
        self.submit_message(
            FlowIdentity::new(origin, FlowDirection::Response),
            HttpMessage::Response(message),
        )
    }

    fn on_response_chunk(&self, origin: FlowOrigin, chunk: Chunk) -> Result<()> {
        self.submit_chunk(FlowIdentity::new(origin, FlowDirection::Response), chunk)
    }
}
