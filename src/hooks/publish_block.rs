//! Purpose: Two-phase rewrite of published signed blocks into the backend's versioned shape.
//! Exports: `ResolvePublishedBlock` (pre-parse), `PreparePublishedBlock` (pre-forward).
//! Role: Phase 1 picks the container variant from the block's slot; phase 2 moves
//! `message` into `<version>_block` and drops the generic container.
//! Invariants: Phase 1 restores the body it peeks at so the default parser can decode it.
//! Invariants: Blinded containers are only accepted on the blinded route, and vice versa.

use std::sync::Arc;

use crate::core::endpoint::{PublishState, RequestContext};
use crate::core::error::{Error, ErrorKind};
use crate::core::fork::{ForkSchedule, SlotField};
use crate::core::payload::{BlockVariant, PayloadKind, PostRequest, PublishBlockRequest};
use crate::hooks::{PreForwardHook, PreParseHook, RunDefault};

pub struct ResolvePublishedBlock {
    schedule: Arc<ForkSchedule>,
    blinded: bool,
}

impl ResolvePublishedBlock {
    pub fn new(schedule: Arc<ForkSchedule>) -> Self {
        Self {
            schedule,
            blinded: false,
        }
    }

    pub fn blinded(schedule: Arc<ForkSchedule>) -> Self {
        Self {
            schedule,
            blinded: true,
        }
    }
}

impl PreParseHook for ResolvePublishedBlock {
    fn name(&self) -> &'static str {
        if self.blinded {
            "resolve_published_blinded_block"
        } else {
            "resolve_published_block"
        }
    }

    fn before_parse(&self, ctx: &mut RequestContext) -> Result<RunDefault, Error> {
        let body = ctx.read_body();
        let resolved = self.schedule.resolve(&body, SlotField::Message);
        ctx.replace_body(body);
        let fork = resolved?;

        let variant = BlockVariant::for_fork(fork, self.blinded);
        ctx.set_payload_kind(PayloadKind::SignedBlock(variant));
        ctx.set_publish_state(PublishState::Resolved(variant));
        tracing::debug!(
            route = %ctx.endpoint().route,
            version = %fork,
            ?variant,
            "resolved published block version"
        );
        Ok(true)
    }
}

pub struct PreparePublishedBlock {
    blinded: bool,
}

impl PreparePublishedBlock {
    pub fn new() -> Self {
        Self { blinded: false }
    }

    pub fn blinded() -> Self {
        Self { blinded: true }
    }

    fn accepts(&self, variant: BlockVariant) -> bool {
        match variant {
            BlockVariant::Phase0 | BlockVariant::Altair => true,
            BlockVariant::Bellatrix => !self.blinded,
            BlockVariant::BlindedBellatrix => self.blinded,
        }
    }
}

impl Default for PreparePublishedBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl PreForwardHook for PreparePublishedBlock {
    fn name(&self) -> &'static str {
        if self.blinded {
            "prepare_published_blinded_block"
        } else {
            "prepare_published_block"
        }
    }

    fn before_forward(&self, ctx: &mut RequestContext) -> Result<(), Error> {
        let Some(PostRequest::SignedBlock(variant, container)) = ctx.take_payload() else {
            return Err(unsupported_block_type());
        };
        if !self.accepts(variant) {
            return Err(unsupported_block_type());
        }

        ctx.set_payload(PostRequest::PublishBlock(PublishBlockRequest::new(
            variant, container,
        )));
        ctx.set_publish_state(PublishState::Transformed(variant));
        tracing::debug!(
            route = %ctx.endpoint().route,
            field = variant.field(),
            "rewrote published block for backend"
        );
        Ok(())
    }
}

fn unsupported_block_type() -> Error {
    Error::new(ErrorKind::UnsupportedVersion).with_message("unsupported block type")
}
