//! Error taxonomy for the shadowcap capture sink.
//!
//! One workspace-wide enum keeps the fault surface small and lets every crate
//! share a single [`Result`] alias. The taxonomy separates caller faults
//! surfaced synchronously on the capture path (`DuplicateFlow`,
//! `ClosedRecord`, `UnknownFlow`) from internal-consistency defects
//! (`MissingMessage`, `Internal`) and from asynchronous persistence failures
//! that are caught and logged at the dispatcher boundary (`Persistence`).

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// All fault conditions the capture sink can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// A second message arrived for a flow slot that is already populated.
    ///
    /// Protocol-level fault in the caller; the first message is kept intact.
    #[error("duplicate message for flow {flow}")]
    DuplicateFlow {
        /// Display form of the offending flow identity.
        flow: String,
    },

    /// An event arrived after the record finalized.
    #[error("record {id} is closed and no longer accepts events")]
    ClosedRecord {
        /// Request identifier of the closed record.
        id: u64,
    },

    /// A wire-level flow tag did not name one of the four valid combinations.
    #[error("unknown flow identity (origin={origin:?}, direction={direction:?})")]
    UnknownFlow {
        /// Raw origin tag as received.
        origin: String,
        /// Raw direction tag as received.
        direction: String,
    },

    /// Encoding was attempted on a slot whose message never arrived.
    ///
    /// Unreachable when the completion invariant holds; treated as a defect.
    #[error("cannot encode flow {flow}: message was never submitted")]
    MissingMessage {
        /// Display form of the empty flow slot.
        flow: String,
    },

    /// The datastore rejected or failed a document insert.
    #[error("persistence failure: {detail}")]
    Persistence {
        /// Store-provided failure description.
        detail: String,
    },

    /// Invariant violation inside the capture core.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CaptureError {
    /// Construct an [`CaptureError::Internal`] from any displayable message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Construct a [`CaptureError::Persistence`] from any displayable detail.
    pub fn persistence(detail: impl Into<String>) -> Self {
        Self::Persistence {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_flow_context() {
        let err = CaptureError::DuplicateFlow {
            flow: "reference/request".to_owned(),
        };
        assert_eq!(err.to_string(), "duplicate message for flow reference/request");
    }

    #[test]
    fn closed_record_names_the_id() {
        let err = CaptureError::ClosedRecord { id: 42 };
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn helpers_build_expected_variants() {
        assert!(matches!(
            CaptureError::internal("oops"),
            CaptureError::Internal(_)
        ));
        assert!(matches!(
            CaptureError::persistence("disk full"),
            CaptureError::Persistence { .. }
        ));
    }
}
