//! Persisted document schema: one self-contained record per captured request.
//!
//! The shapes here are the outbound persistence contract. Documents are
//! insert-only; a store never updates one in place. `shadow_request` /
//! `shadow_response` are omitted from serialized output entirely when
//! shadowing was disabled for the record.

use serde::{Deserialize, Serialize};

/// Header value: single occurrence, or list when the name repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    /// Header name appeared exactly once.
    Single(String),
    /// Header name appeared multiple times; values in arrival order.
    Many(Vec<String>),
}

impl HeaderValue {
    /// Append another occurrence of the same header name.
    pub fn push(&mut self, value: String) {
        match self {
            Self::Single(first) => {
                *self = Self::Many(vec![std::mem::take(first), value]);
            }
            Self::Many(values) => values.push(value),
        }
    }
}

/// One header name with its folded value(s), first-appearance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderField {
    /// Header name verbatim.
    pub name: String,
    /// Folded value(s).
    pub value: HeaderValue,
}

/// One cookie name/value pair parsed from a `Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePair {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
}

/// Captured request half of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDocument {
    /// Request method.
    pub method: String,
    /// Request target.
    pub uri: String,
    /// Protocol version display string.
    pub version: String,
    /// Cookies parsed from `Cookie` header(s); empty when absent.
    pub cookies: Vec<CookiePair>,
    /// Folded header list.
    pub headers: Vec<HeaderField>,
    /// Raw aggregated body bytes.
    pub body: Vec<u8>,
    /// Streamed chunk payloads in arrival order.
    pub chunks: Vec<Vec<u8>>,
}

/// Captured response half of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDocument {
    /// Status code.
    pub status: u16,
    /// Protocol version display string.
    pub version: String,
    /// Folded header list.
    pub headers: Vec<HeaderField>,
    /// Raw aggregated body bytes.
    pub body: Vec<u8>,
    /// Streamed chunk payloads in arrival order.
    pub chunks: Vec<Vec<u8>>,
}

/// Complete capture of one inbound request across all of its flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDocument {
    /// Record creation time, unix milliseconds.
    pub timestamp_ms: i64,
    /// Process-wide capture session identity.
    pub session_id: String,
    /// Proxy-assigned request identifier.
    pub request_id: u64,
    /// Reference request.
    pub request: RequestDocument,
    /// Reference response.
    pub response: ResponseDocument,
    /// Shadow request; present only when shadowing was enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_request: Option<RequestDocument>,
    /// Shadow response; present only when shadowing was enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_response: Option<ResponseDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_value_folds_repeats_into_a_list() {
        let mut value = HeaderValue::Single("a".to_owned());
        value.push("b".to_owned());
        value.push("c".to_owned());
        assert_eq!(
            value,
            HeaderValue::Many(vec!["a".to_owned(), "b".to_owned(), "c".to_owned()])
        );
    }

    #[test]
    fn header_value_serializes_untagged() {
        let single = serde_json::to_string(&HeaderValue::Single("x".to_owned())).unwrap();
        assert_eq!(single, r#""x""#);
        let many =
            serde_json::to_string(&HeaderValue::Many(vec!["x".to_owned(), "y".to_owned()]))
                .unwrap();
        assert_eq!(many, r#"["x","y"]"#);
    }

    #[test]
    fn shadow_fields_are_omitted_when_absent() {
        let doc = CaptureDocument {
            timestamp_ms: 1,
            session_id: "s".to_owned(),
            request_id: 7,
            request: RequestDocument {
                method: "GET".to_owned(),
                uri: "/".to_owned(),
                version: "HTTP/1.1".to_owned(),
                cookies: Vec::new(),
                headers: Vec::new(),
                body: Vec::new(),
                chunks: Vec::new(),
            },
            response: ResponseDocument {
                status: 200,
                version: "HTTP/1.1".to_owned(),
                headers: Vec::new(),
                body: Vec::new(),
                chunks: Vec::new(),
            },
            shadow_request: None,
            shadow_response: None,
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("shadow_request"));
        assert!(!json.contains("shadow_response"));
    }
}
