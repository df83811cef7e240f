//! Read-side auditing over persisted capture documents.
//!
//! The capture path guarantees at most one document per request id; this
//! crate provides the corresponding read-time correctness check, scanning
//! stored documents for `request_id` values that appear more than once. It
//! sits outside the capture core and never touches the write path.

use std::collections::BTreeMap;

use shadowcap_types::CaptureDocument;

/// One request id that was persisted more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// The repeated request identifier.
    pub request_id: u64,
    /// How many documents carry it.
    pub count: usize,
}

/// Scan documents for duplicated `request_id` values.
///
/// Returns one group per repeated id, ascending by id. An empty result means
/// the exactly-once finalize guarantee held for the scanned set.
pub fn duplicate_request_ids<'a, I>(documents: I) -> Vec<DuplicateGroup>
where
    I: IntoIterator<Item = &'a CaptureDocument>,
{
    let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
    for document in documents {
        *counts.entry(document.request_id).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(request_id, count)| DuplicateGroup { request_id, count })
        .collect()
}
