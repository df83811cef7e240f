//! Document sink abstraction.
//!
//! The capture core only needs an insert-capable document sink; connection
//! and session management for a real datastore stays outside. Every write is
//! a self-contained insert, never an update, so implementations need no
//! record-level coordination beyond their own handle sharing.

use parking_lot::Mutex;
use shadowcap_error::Result;
use shadowcap_types::CaptureDocument;

/// Insert-only document sink shared across dispatcher workers.
pub trait DocumentStore: Send + Sync {
    /// Append one capture document. Implementations must be safe to call
    /// concurrently from multiple workers.
    fn insert(&self, document: CaptureDocument) -> Result<()>;
}

/// In-memory store used by tests, auditing, and lightweight embeddings.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<CaptureDocument>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents inserted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    /// True when nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }

    /// Copy of all inserted documents, insertion order.
    #[must_use]
    pub fn documents(&self) -> Vec<CaptureDocument> {
        self.documents.lock().clone()
    }
}

impl DocumentStore for MemoryStore {
    fn insert(&self, document: CaptureDocument) -> Result<()> {
        self.documents.lock().push(document);
        Ok(())
    }
}
