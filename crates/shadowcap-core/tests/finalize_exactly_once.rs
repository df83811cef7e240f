//! Exactly-once finalize under concurrency and under arbitrary arrival
//! interleavings.
//!
//! The four flows of one record race from independent pipeline threads; no
//! matter how their message and chunk events interleave, exactly one
//! submission must observe `Completed`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use proptest::prelude::*;
use shadowcap_core::{CaptureRecord, SubmitOutcome};
use shadowcap_types::{
    Chunk, FlowIdentity, HttpMessage, HttpVersion, RequestHead, RequestId, ResponseHead,
};

fn request_message(chunked: bool) -> HttpMessage {
    HttpMessage::Request(RequestHead {
        method: "GET".to_owned(),
        target: "/race".to_owned(),
        version: HttpVersion::Http11,
        headers: Vec::new(),
        body: Vec::new(),
        chunked,
    })
}

fn response_message(chunked: bool) -> HttpMessage {
    HttpMessage::Response(ResponseHead {
        status: 200,
        version: HttpVersion::Http11,
        headers: Vec::new(),
        body: Vec::new(),
        chunked,
    })
}

fn message_for(flow: FlowIdentity, chunked: bool) -> HttpMessage {
    match flow.direction {
        shadowcap_types::FlowDirection::Request => request_message(chunked),
        shadowcap_types::FlowDirection::Response => response_message(chunked),
    }
}

#[test]
fn four_racing_messages_complete_exactly_once() {
    for _ in 0..200 {
        let record = Arc::new(CaptureRecord::new(RequestId(1), true));
        let barrier = Arc::new(Barrier::new(4));
        let completions = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = FlowIdentity::ALL
            .into_iter()
            .map(|flow| {
                let record = Arc::clone(&record);
                let barrier = Arc::clone(&barrier);
                let completions = Arc::clone(&completions);
                thread::spawn(move || {
                    barrier.wait();
                    let outcome = record.submit_message(flow, message_for(flow, false)).unwrap();
                    if outcome == SubmitOutcome::Completed {
                        completions.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert!(record.is_closed());
    }
}

#[test]
fn racing_chunked_flows_complete_exactly_once() {
    for _ in 0..100 {
        let record = Arc::new(CaptureRecord::new(RequestId(2), true));
        let barrier = Arc::new(Barrier::new(4));
        let completions = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = FlowIdentity::ALL
            .into_iter()
            .map(|flow| {
                let record = Arc::clone(&record);
                let barrier = Arc::clone(&barrier);
                let completions = Arc::clone(&completions);
                // Responses stream two chunks; per-flow order is preserved
                // within each thread, as the pipeline guarantees.
                let chunked = flow.direction == shadowcap_types::FlowDirection::Response;
                thread::spawn(move || {
                    barrier.wait();
                    let mut completed = 0_usize;
                    let outcome = record
                        .submit_message(flow, message_for(flow, chunked))
                        .unwrap();
                    completed += usize::from(outcome == SubmitOutcome::Completed);
                    if chunked {
                        let mid = record.submit_chunk(flow, Chunk::data(vec![1])).unwrap();
                        completed += usize::from(mid == SubmitOutcome::Completed);
                        let last = record
                            .submit_chunk(flow, Chunk::terminal(vec![2]))
                            .unwrap();
                        completed += usize::from(last == SubmitOutcome::Completed);
                    }
                    completions.fetch_add(completed, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert!(record.is_closed());
    }
}

#[derive(Debug, Clone)]
enum Event {
    Message(FlowIdentity, bool),
    Chunk(FlowIdentity, Chunk),
}

/// Per-flow event queues for a fully shadowed record; responses optionally
/// stream `chunk_count` chunks ending in the terminal marker.
fn flow_queues(
    reference_chunked: bool,
    shadow_chunked: bool,
    chunk_count: usize,
) -> [VecDeque<Event>; 4] {
    let mut queues = [
        VecDeque::new(),
        VecDeque::new(),
        VecDeque::new(),
        VecDeque::new(),
    ];
    for flow in FlowIdentity::ALL {
        let chunked = match flow {
            FlowIdentity::REFERENCE_RESPONSE => reference_chunked,
            FlowIdentity::SHADOW_RESPONSE => shadow_chunked,
            _ => false,
        };
        let queue = &mut queues[flow.slot_index()];
        queue.push_back(Event::Message(flow, chunked));
        if chunked {
            for _ in 1..chunk_count {
                queue.push_back(Event::Chunk(flow, Chunk::data(vec![0])));
            }
            queue.push_back(Event::Chunk(flow, Chunk::terminal(vec![9])));
        }
    }
    queues
}

/// Strategy producing chunking flags plus a shuffled merge order over the
/// resulting event multiset (per-flow order stays intact when merging).
fn interleaving() -> impl Strategy<Value = (bool, bool, usize, Vec<usize>)> {
    (any::<bool>(), any::<bool>(), 1_usize..4).prop_flat_map(|(rc, sc, chunks)| {
        let queues = flow_queues(rc, sc, chunks);
        let mut merge_order = Vec::new();
        for (slot, queue) in queues.iter().enumerate() {
            merge_order.extend(std::iter::repeat_n(slot, queue.len()));
        }
        (
            Just(rc),
            Just(sc),
            Just(chunks),
            Just(merge_order).prop_shuffle(),
        )
    })
}

proptest! {
    #[test]
    fn any_arrival_interleaving_completes_exactly_once(
        (reference_chunked, shadow_chunked, chunk_count, merge_order) in interleaving()
    ) {
        let record = CaptureRecord::new(RequestId(3), true);
        let mut queues = flow_queues(reference_chunked, shadow_chunked, chunk_count);
        let total = merge_order.len();

        let mut completions = 0_usize;
        for (position, slot) in merge_order.into_iter().enumerate() {
            let outcome = match queues[slot].pop_front().expect("merge order matches queues") {
                Event::Message(flow, chunked) => {
                    record.submit_message(flow, message_for(flow, chunked)).unwrap()
                }
                Event::Chunk(flow, chunk) => record.submit_chunk(flow, chunk).unwrap(),
            };
            if outcome == SubmitOutcome::Completed {
                completions += 1;
                prop_assert_eq!(position, total - 1, "only the final event can complete");
            }
        }

        prop_assert_eq!(completions, 1);
        prop_assert!(record.is_closed());
    }

    #[test]
    fn non_shadowing_records_only_complete_on_reference_events(
        merge_order in Just((0..6_usize).collect::<Vec<_>>()).prop_shuffle()
    ) {
        // Six events: the reference pair plus four shadow noise events that
        // must be stored without fault and ignored by the completion test.
        let record = CaptureRecord::new(RequestId(4), false);
        let mut events: Vec<Option<Event>> = vec![
            Some(Event::Message(FlowIdentity::REFERENCE_REQUEST, false)),
            Some(Event::Message(FlowIdentity::REFERENCE_RESPONSE, false)),
            Some(Event::Message(FlowIdentity::SHADOW_REQUEST, false)),
            Some(Event::Message(FlowIdentity::SHADOW_RESPONSE, false)),
            Some(Event::Chunk(FlowIdentity::SHADOW_REQUEST, Chunk::data(vec![1]))),
            Some(Event::Chunk(FlowIdentity::SHADOW_RESPONSE, Chunk::terminal(vec![2]))),
        ];

        let mut completions = 0_usize;
        for index in merge_order {
            let event = events[index].take().expect("each event applied once");
            let flow = match &event {
                Event::Message(flow, _) | Event::Chunk(flow, _) => *flow,
            };
            let submission = match event {
                Event::Message(flow, chunked) => {
                    record.submit_message(flow, message_for(flow, chunked))
                }
                Event::Chunk(flow, chunk) => record.submit_chunk(flow, chunk),
            };
            match submission {
                Ok(SubmitOutcome::Completed) => {
                    completions += 1;
                    prop_assert!(flow.is_reference(), "shadow noise must not complete");
                }
                Ok(SubmitOutcome::Accepted) => {}
                // Shadow noise delivered after the reference pair closed the
                // record is rejected, never silently absorbed.
                Err(err) => prop_assert!(
                    matches!(err, shadowcap_error::CaptureError::ClosedRecord { .. }),
                    "expected CaptureError::ClosedRecord, got {:?}",
                    err
                ),
            }
        }

        prop_assert_eq!(completions, 1);
        prop_assert!(record.is_closed());
    }
}
