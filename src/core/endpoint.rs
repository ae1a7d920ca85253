//! Purpose: Endpoint descriptors and the per-request context hooks operate on.
//! Exports: `Endpoint`, `RequestContext`, `PublishState`.
//! Role: Carries the expected payload type, the replaceable body, the parsed payload,
//! and the resolved block version through one request's pipeline.
//! Invariants: A context owns its own copy of the endpoint; nothing is shared across requests.
//! Invariants: Publish state only moves forward: Unresolved -> Resolved -> Transformed.

use bytes::Bytes;

use crate::core::error::Error;
use crate::core::payload::{BlockVariant, PayloadKind, PostRequest};
use crate::core::response::ResponseKind;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoint {
    pub route: String,
    pub post_request: PayloadKind,
    pub response: ResponseKind,
}

impl Endpoint {
    pub fn new(route: impl Into<String>, post_request: PayloadKind, response: ResponseKind) -> Self {
        Self {
            route: route.into(),
            post_request,
            response,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PublishState {
    Unresolved,
    Resolved(BlockVariant),
    Transformed(BlockVariant),
}

#[derive(Debug)]
pub struct RequestContext {
    endpoint: Endpoint,
    body: Bytes,
    payload: Option<PostRequest>,
    publish: PublishState,
}

impl RequestContext {
    pub fn new(endpoint: Endpoint, body: impl Into<Bytes>) -> Self {
        Self {
            endpoint,
            body: body.into(),
            payload: None,
            publish: PublishState::Unresolved,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn payload_kind(&self) -> PayloadKind {
        self.endpoint.post_request
    }

    pub fn set_payload_kind(&mut self, kind: PayloadKind) {
        self.endpoint.post_request = kind;
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consumes the body; callers that only peek must hand it back via `replace_body`.
    pub fn read_body(&mut self) -> Bytes {
        std::mem::take(&mut self.body)
    }

    pub fn replace_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    pub fn payload(&self) -> Option<&PostRequest> {
        self.payload.as_ref()
    }

    pub fn take_payload(&mut self) -> Option<PostRequest> {
        self.payload.take()
    }

    pub fn set_payload(&mut self, payload: PostRequest) {
        self.payload = Some(payload);
    }

    pub fn publish_state(&self) -> PublishState {
        self.publish
    }

    pub fn set_publish_state(&mut self, state: PublishState) {
        self.publish = state;
    }

    /// Default parse: decodes the current body into the endpoint's payload type.
    pub fn parse(&mut self) -> Result<&PostRequest, Error> {
        let payload = self.endpoint.post_request.decode(&self.body)?;
        Ok(self.payload.insert(payload))
    }
}
