//! Flow identities: which of the four independent message streams an event
//! belongs to.
//!
//! A flow is the pair `(origin, direction)` with two origins (reference and
//! shadow) and two directions (request and response). The typed pair makes
//! invalid combinations unrepresentable inside the core; pipelines that carry
//! raw wire tags go through [`FlowIdentity::from_tags`], which is where
//! `UnknownFlow` faults surface.

use std::fmt;

use serde::{Deserialize, Serialize};
use shadowcap_error::{CaptureError, Result};

/// Which traffic path a flow belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowOrigin {
    /// Primary path whose response is returned to the original caller.
    Reference,
    /// Duplicated path sent to the secondary backend for capture only.
    Shadow,
}

/// Which half of the HTTP exchange a flow carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDirection {
    /// Client-to-server message.
    Request,
    /// Server-to-client message.
    Response,
}

/// One of the four independent message streams of a captured request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowIdentity {
    /// Traffic path.
    pub origin: FlowOrigin,
    /// Exchange half.
    pub direction: FlowDirection,
}

impl FlowIdentity {
    /// Reference request flow.
    pub const REFERENCE_REQUEST: Self = Self::new(FlowOrigin::Reference, FlowDirection::Request);
    /// Reference response flow.
    pub const REFERENCE_RESPONSE: Self = Self::new(FlowOrigin::Reference, FlowDirection::Response);
    /// Shadow request flow.
    pub const SHADOW_REQUEST: Self = Self::new(FlowOrigin::Shadow, FlowDirection::Request);
    /// Shadow response flow.
    pub const SHADOW_RESPONSE: Self = Self::new(FlowOrigin::Shadow, FlowDirection::Response);

    /// All four valid flows, in slot order.
    pub const ALL: [Self; 4] = [
        Self::REFERENCE_REQUEST,
        Self::REFERENCE_RESPONSE,
        Self::SHADOW_REQUEST,
        Self::SHADOW_RESPONSE,
    ];

    /// Construct a flow identity from its two components.
    #[must_use]
    pub const fn new(origin: FlowOrigin, direction: FlowDirection) -> Self {
        Self { origin, direction }
    }

    /// Parse raw wire tags into a flow identity.
    ///
    /// Tags are matched case-insensitively against `reference`/`shadow` and
    /// `request`/`response`. Anything else is an [`CaptureError::UnknownFlow`]
    /// caller fault rejected at the boundary.
    pub fn from_tags(origin: &str, direction: &str) -> Result<Self> {
        let parsed_origin = match origin.to_ascii_lowercase().as_str() {
            "reference" => Some(FlowOrigin::Reference),
            "shadow" => Some(FlowOrigin::Shadow),
            _ => None,
        };
        let parsed_direction = match direction.to_ascii_lowercase().as_str() {
            "request" => Some(FlowDirection::Request),
            "response" => Some(FlowDirection::Response),
            _ => None,
        };
        match (parsed_origin, parsed_direction) {
            (Some(o), Some(d)) => Ok(Self::new(o, d)),
            _ => Err(CaptureError::UnknownFlow {
                origin: origin.to_owned(),
                direction: direction.to_owned(),
            }),
        }
    }

    /// Stable dense index of this flow, used for slot addressing.
    #[must_use]
    pub const fn slot_index(self) -> usize {
        match (self.origin, self.direction) {
            (FlowOrigin::Reference, FlowDirection::Request) => 0,
            (FlowOrigin::Reference, FlowDirection::Response) => 1,
            (FlowOrigin::Shadow, FlowDirection::Request) => 2,
            (FlowOrigin::Shadow, FlowDirection::Response) => 3,
        }
    }

    /// True for the two reference flows.
    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(self.origin, FlowOrigin::Reference)
    }
}

impl fmt::Display for FlowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match self.origin {
            FlowOrigin::Reference => "reference",
            FlowOrigin::Shadow => "shadow",
        };
        let direction = match self.direction {
            FlowDirection::Request => "request",
            FlowDirection::Response => "response",
        };
        write!(f, "{origin}/{direction}")
    }
}
