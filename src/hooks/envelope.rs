//! Purpose: Wrap bare JSON arrays into the single-field objects the backend expects.
//! Exports: `ArrayEnvelope`, `wrap_array`.
//! Role: One generic pre-parse adapter, instantiated per list-shaped route.
//! Invariants: Only acts when the endpoint's payload type is this adapter's wrapper.
//! Invariants: Element order and count are preserved; non-array bodies fail to decode.

use bytes::Bytes;
use std::marker::PhantomData;

use crate::core::endpoint::RequestContext;
use crate::core::error::Error;
use crate::core::payload::{ArrayWrapper, PayloadKind};
use crate::hooks::{PreParseHook, RunDefault};
use crate::json::parse;

pub struct ArrayEnvelope<W> {
    wrapper: PhantomData<fn() -> W>,
}

impl<W: ArrayWrapper> ArrayEnvelope<W> {
    pub fn new() -> Self {
        Self {
            wrapper: PhantomData,
        }
    }
}

impl<W: ArrayWrapper> Default for ArrayEnvelope<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: ArrayWrapper> PreParseHook for ArrayEnvelope<W> {
    fn name(&self) -> &'static str {
        "array_envelope"
    }

    fn before_parse(&self, ctx: &mut RequestContext) -> Result<RunDefault, Error> {
        if ctx.payload_kind() != PayloadKind::List(W::KIND) {
            tracing::trace!(
                route = %ctx.endpoint().route,
                expected = W::KIND.name(),
                "array envelope not applicable"
            );
            return Ok(true);
        }
        let body = ctx.read_body();
        let wrapped = wrap_array::<W>(&body)?;
        ctx.replace_body(wrapped);
        Ok(true)
    }
}

/// Decodes `body` as `[Element, ...]` and re-encodes it as `{FIELD: [...]}`.
pub fn wrap_array<W: ArrayWrapper>(body: &[u8]) -> Result<Bytes, Error> {
    let elements: Vec<W::Element> = parse::from_slice(body, "could not decode body")?;
    let count = elements.len();
    let wrapper = W::from_elements(elements);
    let wrapped = parse::to_bytes(&wrapper, "could not marshal wrapped body")?;
    tracing::debug!(
        kind = W::KIND.name(),
        field = W::FIELD,
        count,
        "wrapped array body"
    );
    Ok(wrapped)
}
