//! Purpose: Drive one request or one response through the hooks registered for its route.
//! Exports: `Pipeline`.
//! Role: Request: pre-parse -> default parse -> pre-forward -> encode for the backend.
//! Response: before-decode hook -> default decode -> before-serialize hook -> encode.
//! Invariants: Any hook failure aborts with the error annotated by route; no partial output.
//! Invariants: Pipelines are `Send + Sync` and hold no per-request state.

use bytes::Bytes;
use std::sync::Arc;

use crate::api::registry::{HookRegistry, RouteHooks};
use crate::core::endpoint::RequestContext;
use crate::core::error::{Error, ErrorKind};
use crate::hooks::ResponseStage;

#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<HookRegistry>,
}

impl Pipeline {
    pub fn new(registry: HookRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Rewrites a REST request body into the body the backend expects.
    pub fn transcode_request(&self, route: &str, body: impl Into<Bytes>) -> Result<Bytes, Error> {
        let hooks = self.registry.lookup(route)?;
        transcode_request(hooks, body.into()).map_err(|err| annotate(err, route))
    }

    /// Rewrites a backend response body into the REST shape.
    pub fn transcode_response(&self, route: &str, raw: &[u8]) -> Result<Bytes, Error> {
        let hooks = self.registry.lookup(route)?;
        transcode_response(hooks, raw).map_err(|err| annotate(err, route))
    }
}

fn transcode_request(hooks: &RouteHooks, body: Bytes) -> Result<Bytes, Error> {
    let mut ctx = RequestContext::new(hooks.endpoint.clone(), body);

    let run_default = match &hooks.pre_parse {
        Some(hook) => {
            tracing::trace!(hook = hook.name(), "running pre-parse hook");
            hook.before_parse(&mut ctx)?
        }
        None => true,
    };
    if !run_default {
        return Ok(ctx.read_body());
    }

    ctx.parse()?;

    if let Some(hook) = &hooks.pre_forward {
        tracing::trace!(hook = hook.name(), "running pre-forward hook");
        hook.before_forward(&mut ctx)?;
    }

    let payload = ctx.take_payload().ok_or_else(|| {
        Error::new(ErrorKind::Internal).with_message("request payload missing after parse")
    })?;
    payload.to_bytes()
}

fn transcode_response(hooks: &RouteHooks, raw: &[u8]) -> Result<Bytes, Error> {
    let kind = hooks.endpoint.response;
    let mut container = kind.empty();
    let mut run_default = true;

    if let Some(hook) = hooks
        .post_process
        .as_ref()
        .filter(|hook| hook.stage() == ResponseStage::BeforeDecode)
    {
        let outcome = hook.process(raw, &mut container)?;
        if let Some(body) = outcome.body {
            return Ok(body);
        }
        run_default = outcome.run_default;
    }

    if run_default {
        container = kind.decode(raw)?;
    }

    if let Some(hook) = hooks
        .post_process
        .as_ref()
        .filter(|hook| hook.stage() == ResponseStage::BeforeSerialize)
    {
        let outcome = hook.process(raw, &mut container)?;
        if let Some(body) = outcome.body {
            return Ok(body);
        }
    }

    container.to_bytes()
}

fn annotate(err: Error, route: &str) -> Error {
    tracing::warn!(route, kind = ?err.kind(), error = %err, "transcoding failed");
    if err.route().is_some() {
        err
    } else {
        err.with_route(route)
    }
}
