//! Per-request correlation state machine.
//!
//! A [`CaptureRecord`] owns the four message slots of one proxied request and
//! decides, under a single per-record lock, when every expected flow has
//! fully arrived. The completion check and the `Open -> Finalizing` phase
//! transition happen under the same lock hold, so exactly one submitting
//! caller observes [`SubmitOutcome::Completed`] regardless of how the four
//! pipelines interleave. That caller hands the record to the persistence
//! dispatcher; everyone else keeps going.
//!
//! Records with missing flows stay `Open` indefinitely. Reclaiming them is
//! the embedding proxy's request-lifecycle bookkeeping (an age-keyed reaper
//! is the recommended shape), not this crate's.

use parking_lot::Mutex;
use shadowcap_error::{CaptureError, Result};
use shadowcap_types::{Chunk, FlowIdentity, HttpMessage, RequestId, unix_millis};
use tracing::warn;

/// Lifecycle phase of a capture record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordPhase {
    /// Accepting message and chunk events.
    Open,
    /// Completion detected; a persistence task owns the record.
    Finalizing,
    /// Terminal. The persistence attempt finished; the record is inert.
    Done,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "exactly one caller observes Completed and must dispatch persistence"]
pub enum SubmitOutcome {
    /// Event stored; the record is still waiting on other flows.
    Accepted,
    /// This event completed the record. The caller must dispatch it.
    Completed,
}

/// One flow's slot: the decoded message (once it arrives) plus its
/// arrival-ordered chunk buffer.
#[derive(Debug, Clone, Default)]
pub struct MessageSlot {
    message: Option<HttpMessage>,
    chunks: Vec<Chunk>,
}

impl MessageSlot {
    /// Decoded message, if this flow has delivered it.
    #[must_use]
    pub fn message(&self) -> Option<&HttpMessage> {
        self.message.as_ref()
    }

    /// Chunk payloads in arrival order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// True when this slot no longer blocks completion: its message is
    /// present and, for chunked transfer, the most recent chunk carries the
    /// terminal marker. Only the latest chunk can be terminal, so the check
    /// never rescans the buffer.
    fn is_satisfied(&self) -> bool {
        match &self.message {
            None => false,
            Some(message) => {
                !message.is_chunked() || self.chunks.last().is_some_and(|chunk| chunk.last)
            }
        }
    }
}

#[derive(Debug)]
struct RecordState {
    slots: [MessageSlot; 4],
    phase: RecordPhase,
}

/// Immutable copy of a finalized record's slots, taken under the record lock.
///
/// The persistence side only ever sees one of these, so no partial view of a
/// record can cross from the mutation side.
#[derive(Debug, Clone)]
pub struct RecordSnapshot {
    id: RequestId,
    timestamp_ms: i64,
    shadowing: bool,
    slots: [MessageSlot; 4],
}

impl RecordSnapshot {
    /// Request identifier.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Record creation time, unix milliseconds.
    #[must_use]
    pub const fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Whether shadow flows were expected for this record.
    #[must_use]
    pub const fn shadowing(&self) -> bool {
        self.shadowing
    }

    /// Slot for one flow.
    #[must_use]
    pub fn slot(&self, flow: FlowIdentity) -> &MessageSlot {
        &self.slots[flow.slot_index()]
    }
}

/// Mutable aggregate correlating the up-to-four flows of one inbound request.
#[derive(Debug)]
pub struct CaptureRecord {
    id: RequestId,
    timestamp_ms: i64,
    shadowing: bool,
    state: Mutex<RecordState>,
}

impl CaptureRecord {
    /// Create an open record for `id`. `shadowing` decides which slots the
    /// completion test requires and is fixed for the record's lifetime.
    #[must_use]
    pub fn new(id: RequestId, shadowing: bool) -> Self {
        Self {
            id,
            timestamp_ms: unix_millis(),
            shadowing,
            state: Mutex::new(RecordState {
                slots: [
                    MessageSlot::default(),
                    MessageSlot::default(),
                    MessageSlot::default(),
                    MessageSlot::default(),
                ],
                phase: RecordPhase::Open,
            }),
        }
    }

    /// Request identifier.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Record creation time, unix milliseconds.
    #[must_use]
    pub const fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Whether shadow flows count towards completion.
    #[must_use]
    pub const fn shadowing(&self) -> bool {
        self.shadowing
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> RecordPhase {
        self.state.lock().phase
    }

    /// True once the record stopped accepting events.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.phase() != RecordPhase::Open
    }

    /// Store the decoded message for `flow`.
    ///
    /// Fails with [`CaptureError::ClosedRecord`] after finalization, with
    /// [`CaptureError::DuplicateFlow`] when the slot is already populated,
    /// and with an internal fault when the message variant contradicts the
    /// flow direction. On success the completion test runs under the same
    /// lock hold; at most one submission per record ever returns
    /// [`SubmitOutcome::Completed`].
    pub fn submit_message(&self, flow: FlowIdentity, message: HttpMessage) -> Result<SubmitOutcome> {
        if message.direction() != flow.direction {
            return Err(CaptureError::internal(format!(
                "message direction {:?} does not match flow {flow}",
                message.direction()
            )));
        }

        let mut state = self.state.lock();
        if state.phase != RecordPhase::Open {
            warn!(record_id = self.id.get(), %flow, "message after close rejected");
            return Err(CaptureError::ClosedRecord { id: self.id.get() });
        }

        let slot = &mut state.slots[flow.slot_index()];
        if slot.message.is_some() {
            warn!(record_id = self.id.get(), %flow, "duplicate message rejected");
            return Err(CaptureError::DuplicateFlow {
                flow: flow.to_string(),
            });
        }
        slot.message = Some(message);

        Ok(self.try_finalize(&mut state))
    }

    /// Append a body chunk to `flow`'s buffer.
    ///
    /// Fails with [`CaptureError::ClosedRecord`] after finalization. The
    /// completion test re-runs on every chunk: only inspection can tell a
    /// terminal chunk apart, and a chunk may well be the last event the
    /// record was waiting for.
    pub fn submit_chunk(&self, flow: FlowIdentity, chunk: Chunk) -> Result<SubmitOutcome> {
        let mut state = self.state.lock();
        if state.phase != RecordPhase::Open {
            warn!(record_id = self.id.get(), %flow, "chunk after close rejected");
            return Err(CaptureError::ClosedRecord { id: self.id.get() });
        }

        state.slots[flow.slot_index()].chunks.push(chunk);

        Ok(self.try_finalize(&mut state))
    }

    /// Completion test plus one-shot `Open -> Finalizing` transition.
    /// Caller holds the state lock.
    fn try_finalize(&self, state: &mut RecordState) -> SubmitOutcome {
        if Self::is_complete_inner(self.shadowing, &state.slots) {
            state.phase = RecordPhase::Finalizing;
            SubmitOutcome::Completed
        } else {
            SubmitOutcome::Accepted
        }
    }

    /// Pure completion predicate over the current slots.
    ///
    /// Shadow slots only count when shadowing is enabled; stray shadow events
    /// on a non-shadowing record are stored but never block or trigger
    /// completion.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        Self::is_complete_inner(self.shadowing, &self.state.lock().slots)
    }

    fn is_complete_inner(shadowing: bool, slots: &[MessageSlot; 4]) -> bool {
        let required: &[FlowIdentity] = if shadowing {
            &FlowIdentity::ALL
        } else {
            &[
                FlowIdentity::REFERENCE_REQUEST,
                FlowIdentity::REFERENCE_RESPONSE,
            ]
        };
        required
            .iter()
            .all(|flow| slots[flow.slot_index()].is_satisfied())
    }

    /// Copy the slots for encoding. Taken under the record lock, after the
    /// record left `Open`, so the view is complete and stable.
    #[must_use]
    pub fn snapshot(&self) -> RecordSnapshot {
        let state = self.state.lock();
        RecordSnapshot {
            id: self.id,
            timestamp_ms: self.timestamp_ms,
            shadowing: self.shadowing,
            slots: state.slots.clone(),
        }
    }

    /// Mark the persistence attempt finished, `Finalizing -> Done`.
    ///
    /// Called by the dispatcher worker whether the write succeeded or not;
    /// the record becomes eligible for reclamation either way.
    pub fn mark_done(&self) {
        let mut state = self.state.lock();
        match state.phase {
            RecordPhase::Finalizing => state.phase = RecordPhase::Done,
            RecordPhase::Open => {
                warn!(record_id = self.id.get(), "mark_done on a record that never finalized");
            }
            RecordPhase::Done => {}
        }
    }
}
