//! Capture-and-correlation core of a traffic-shadowing HTTP proxy.
//!
//! For every inbound request the proxy forwards, this crate observes up to
//! four independent, asynchronously arriving flows — the reference request
//! and response plus, when shadowing is enabled, the duplicated shadow pair —
//! and assembles them into exactly one durable document once all expected
//! flows (including streamed chunk sequences) have fully arrived.
//!
//! Write-path capture only: no chunk re-ordering or redelivery, no HTTP
//! semantic validation beyond presence, no read-side queries. Records whose
//! flows never all arrive stay open; evicting them by age is left to the
//! embedding proxy's request-lifecycle bookkeeping.

pub mod dispatch;
pub mod encode;
pub mod record;
pub mod sink;
pub mod store;

pub use dispatch::PersistenceDispatcher;
pub use encode::{encode_record, encode_request, encode_response, fold_headers, parse_cookies};
pub use record::{CaptureRecord, MessageSlot, RecordPhase, RecordSnapshot, SubmitOutcome};
pub use sink::{CaptureSink, CaptureSinkFactory, FlowEventSink};
pub use store::{DocumentStore, MemoryStore};
