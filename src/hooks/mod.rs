//! Purpose: Hook contracts and the hook implementations the registry wires to routes.
//! Exports: `PreParseHook`, `PreForwardHook`, `PostProcessHook`, `PostProcessOutcome`,
//! `ResponseStage`, `RunDefault`, and the hook modules.
//! Role: Stateless transforms applied to exactly one request or response.
//! Invariants: Hooks never share mutable state; the only shared input is the fork schedule.
//! Invariants: A failing hook aborts the request with no partial output.

use bytes::Bytes;

use crate::core::endpoint::RequestContext;
use crate::core::error::Error;
use crate::core::response::ResponseContainer;

pub mod envelope;
pub mod flatten;
pub mod publish_block;
pub mod versioned;

/// `true` tells the pipeline to continue with its default behavior.
pub type RunDefault = bool;

/// Runs before the generic parser decodes the request body.
pub trait PreParseHook: Send + Sync {
    fn name(&self) -> &'static str;
    fn before_parse(&self, ctx: &mut RequestContext) -> Result<RunDefault, Error>;
}

/// Runs after parsing, before the payload is encoded for the backend.
pub trait PreForwardHook: Send + Sync {
    fn name(&self) -> &'static str;
    fn before_forward(&self, ctx: &mut RequestContext) -> Result<(), Error>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseStage {
    /// Sees raw backend bytes before the default decode into the container.
    BeforeDecode,
    /// Sees the decoded container before the default serialization.
    BeforeSerialize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostProcessOutcome {
    pub run_default: RunDefault,
    /// Bytes to write verbatim instead of serializing the container.
    pub body: Option<Bytes>,
}

impl PostProcessOutcome {
    pub fn replace(body: Bytes) -> Self {
        Self {
            run_default: false,
            body: Some(body),
        }
    }

    pub fn handled() -> Self {
        Self {
            run_default: false,
            body: None,
        }
    }
}

pub trait PostProcessHook: Send + Sync {
    fn name(&self) -> &'static str;
    fn stage(&self) -> ResponseStage;
    fn process(
        &self,
        raw: &[u8],
        container: &mut ResponseContainer,
    ) -> Result<PostProcessOutcome, Error>;
}
