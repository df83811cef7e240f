//! Document encoding: decoded messages plus chunk buffers into the persisted
//! schema.
//!
//! Encoding is pure and total given a present message. The slot-level entry
//! points fail with `MissingMessage` when the slot never received its
//! message; the completion invariant makes that unreachable on the normal
//! path, so it is reported as a defect rather than tolerated.

use shadowcap_error::{CaptureError, Result};
use shadowcap_types::{
    CaptureDocument, Chunk, CookiePair, FlowIdentity, HeaderField, HeaderValue, RequestDocument,
    RequestHead, ResponseDocument, ResponseHead, SessionId,
};

use crate::record::{MessageSlot, RecordSnapshot};

const COOKIE_HEADER: &str = "cookie";

/// Fold raw header pairs into a first-appearance-ordered list where repeated
/// names collapse into a value list. Name comparison is case-insensitive;
/// the first-seen spelling is kept.
#[must_use]
pub fn fold_headers(headers: &[(String, String)]) -> Vec<HeaderField> {
    let mut folded: Vec<HeaderField> = Vec::new();
    for (name, value) in headers {
        match folded
            .iter_mut()
            .find(|field| field.name.eq_ignore_ascii_case(name))
        {
            Some(field) => field.value.push(value.clone()),
            None => folded.push(HeaderField {
                name: name.clone(),
                value: HeaderValue::Single(value.clone()),
            }),
        }
    }
    folded
}

/// Parse `Cookie` header(s) into name/value pairs.
///
/// Pairs are `;`-separated, whitespace-trimmed; fragments without `=` are
/// skipped. Absent header yields an empty list.
#[must_use]
pub fn parse_cookies(headers: &[(String, String)]) -> Vec<CookiePair> {
    let mut cookies = Vec::new();
    for (name, value) in headers {
        if !name.eq_ignore_ascii_case(COOKIE_HEADER) {
            continue;
        }
        for fragment in value.split(';') {
            if let Some((cookie_name, cookie_value)) = fragment.split_once('=') {
                let cookie_name = cookie_name.trim();
                if cookie_name.is_empty() {
                    continue;
                }
                cookies.push(CookiePair {
                    name: cookie_name.to_owned(),
                    value: cookie_value.trim().to_owned(),
                });
            }
        }
    }
    cookies
}

fn chunk_payloads(chunks: &[Chunk]) -> Vec<Vec<u8>> {
    chunks.iter().map(|chunk| chunk.payload.clone()).collect()
}

/// Encode a decoded request head plus its chunk buffer.
#[must_use]
pub fn encode_request(head: &RequestHead, chunks: &[Chunk]) -> RequestDocument {
    RequestDocument {
        method: head.method.clone(),
        uri: head.target.clone(),
        version: head.version.as_str().to_owned(),
        cookies: parse_cookies(&head.headers),
        headers: fold_headers(&head.headers),
        body: head.body.clone(),
        chunks: chunk_payloads(chunks),
    }
}

/// Encode a decoded response head plus its chunk buffer.
#[must_use]
pub fn encode_response(head: &ResponseHead, chunks: &[Chunk]) -> ResponseDocument {
    ResponseDocument {
        status: head.status,
        version: head.version.as_str().to_owned(),
        headers: fold_headers(&head.headers),
        body: head.body.clone(),
        chunks: chunk_payloads(chunks),
    }
}

fn request_slot(slot: &MessageSlot, flow: FlowIdentity) -> Result<RequestDocument> {
    let message = slot.message().ok_or_else(|| CaptureError::MissingMessage {
        flow: flow.to_string(),
    })?;
    Ok(encode_request(message.as_request()?, slot.chunks()))
}

fn response_slot(slot: &MessageSlot, flow: FlowIdentity) -> Result<ResponseDocument> {
    let message = slot.message().ok_or_else(|| CaptureError::MissingMessage {
        flow: flow.to_string(),
    })?;
    Ok(encode_response(message.as_response()?, slot.chunks()))
}

/// Build the composite document for a finalized record.
///
/// The shadow sub-documents are encoded only when the record expected shadow
/// flows; stray shadow slots on a non-shadowing record are dropped.
pub fn encode_record(snapshot: &RecordSnapshot, session: &SessionId) -> Result<CaptureDocument> {
    let request = request_slot(
        snapshot.slot(FlowIdentity::REFERENCE_REQUEST),
        FlowIdentity::REFERENCE_REQUEST,
    )?;
    let response = response_slot(
        snapshot.slot(FlowIdentity::REFERENCE_RESPONSE),
        FlowIdentity::REFERENCE_RESPONSE,
    )?;

    let (shadow_request, shadow_response) = if snapshot.shadowing() {
        (
            Some(request_slot(
                snapshot.slot(FlowIdentity::SHADOW_REQUEST),
                FlowIdentity::SHADOW_REQUEST,
            )?),
            Some(response_slot(
                snapshot.slot(FlowIdentity::SHADOW_RESPONSE),
                FlowIdentity::SHADOW_RESPONSE,
            )?),
        )
    } else {
        (None, None)
    };

    Ok(CaptureDocument {
        timestamp_ms: snapshot.timestamp_ms(),
        session_id: session.as_str().to_owned(),
        request_id: snapshot.id().get(),
        request,
        response,
        shadow_request,
        shadow_response,
    })
}

#[cfg(test)]
mod tests {
    use shadowcap_types::{HttpMessage, HttpVersion, RequestId};

    use crate::record::CaptureRecord;

    use super::*;

    fn pair(name: &str, value: &str) -> (String, String) {
        (name.to_owned(), value.to_owned())
    }

    #[test]
    fn headers_fold_repeats_in_arrival_order() {
        let headers = vec![
            pair("Accept", "text/html"),
            pair("X-Trace", "a"),
            pair("x-trace", "b"),
            pair("X-Trace", "c"),
        ];
        let folded = fold_headers(&headers);
        assert_eq!(folded.len(), 2);
        assert_eq!(folded[0].name, "Accept");
        assert_eq!(folded[0].value, HeaderValue::Single("text/html".to_owned()));
        assert_eq!(folded[1].name, "X-Trace");
        assert_eq!(
            folded[1].value,
            HeaderValue::Many(vec!["a".to_owned(), "b".to_owned(), "c".to_owned()])
        );
    }

    #[test]
    fn cookies_parse_pairs_and_skip_malformed_fragments() {
        let headers = vec![pair("Cookie", "sid=abc; theme=dark ; bare; =orphan; q=1=2")];
        let cookies = parse_cookies(&headers);
        assert_eq!(
            cookies,
            vec![
                CookiePair {
                    name: "sid".to_owned(),
                    value: "abc".to_owned()
                },
                CookiePair {
                    name: "theme".to_owned(),
                    value: "dark".to_owned()
                },
                CookiePair {
                    name: "q".to_owned(),
                    value: "1=2".to_owned()
                },
            ]
        );
    }

    #[test]
    fn cookies_absent_header_yields_empty_list() {
        assert!(parse_cookies(&[pair("Accept", "*/*")]).is_empty());
    }

    #[test]
    fn request_encoding_is_verbatim() {
        let head = RequestHead {
            method: "POST".to_owned(),
            target: "/submit?q=1".to_owned(),
            version: HttpVersion::Http11,
            headers: vec![pair("Cookie", "sid=abc"), pair("Accept", "*/*")],
            body: b"payload".to_vec(),
            chunked: true,
        };
        let chunks = vec![Chunk::data(vec![1, 2]), Chunk::terminal(vec![3])];
        let doc = encode_request(&head, &chunks);
        assert_eq!(doc.method, "POST");
        assert_eq!(doc.uri, "/submit?q=1");
        assert_eq!(doc.version, "HTTP/1.1");
        assert_eq!(doc.cookies.len(), 1);
        assert_eq!(doc.body, b"payload");
        assert_eq!(doc.chunks, vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn encoding_an_unset_slot_is_a_missing_message_fault() {
        let record = CaptureRecord::new(RequestId(11), false);
        let _ = record
            .submit_message(
                FlowIdentity::REFERENCE_RESPONSE,
                HttpMessage::Response(ResponseHead {
                    status: 204,
                    version: HttpVersion::Http11,
                    headers: Vec::new(),
                    body: Vec::new(),
                    chunked: false,
                }),
            )
            .unwrap();
        let err = encode_record(&record.snapshot(), &SessionId::new("s")).unwrap_err();
        assert!(matches!(err, CaptureError::MissingMessage { .. }));
    }
}
