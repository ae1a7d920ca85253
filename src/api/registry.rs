//! Purpose: Table-driven registration of hooks against API routes.
//! Exports: `RouteHooks`, `HookRegistry`.
//! Role: Built once at startup; each route owns its own hook instances.
//! Invariants: Route templates are unique; `{param}` segments match one non-empty segment.
//! Invariants: The registry is immutable once handed to a `Pipeline`.

use std::sync::Arc;

use crate::core::endpoint::Endpoint;
use crate::core::error::{Error, ErrorKind};
use crate::core::fork::ForkSchedule;
use crate::core::payload::{
    ArrayWrapper, DutiesRequest, FeeRecipientsRequest, PayloadKind,
    SignedValidatorRegistrationsRequest, SubmitAggregateAndProofsRequest,
    SubmitAttestationsRequest, SubmitBeaconCommitteeSubscriptionsRequest,
    SubmitContributionAndProofsRequest, SubmitSyncCommitteeSignaturesRequest,
    SubmitSyncCommitteeSubscriptionsRequest,
};
use crate::core::response::ResponseKind;
use crate::hooks::envelope::ArrayEnvelope;
use crate::hooks::flatten::FlattenValidatorAggregates;
use crate::hooks::publish_block::{PreparePublishedBlock, ResolvePublishedBlock};
use crate::hooks::versioned::{VersionedSerializer, VersionedShape};
use crate::hooks::{PostProcessHook, PreForwardHook, PreParseHook};

#[derive(Clone)]
pub struct RouteHooks {
    pub endpoint: Endpoint,
    pub pre_parse: Option<Arc<dyn PreParseHook>>,
    pub pre_forward: Option<Arc<dyn PreForwardHook>>,
    pub post_process: Option<Arc<dyn PostProcessHook>>,
}

impl RouteHooks {
    pub fn new(route: &str, post_request: PayloadKind, response: ResponseKind) -> Self {
        Self {
            endpoint: Endpoint::new(route, post_request, response),
            pre_parse: None,
            pre_forward: None,
            post_process: None,
        }
    }

    /// A route posting a bare array that the backend expects wrapped in `W`.
    pub fn array<W: ArrayWrapper + 'static>(route: &str) -> Self {
        Self::new(route, PayloadKind::List(W::KIND), ResponseKind::Passthrough)
            .with_pre_parse(ArrayEnvelope::<W>::new())
    }

    pub fn with_pre_parse(mut self, hook: impl PreParseHook + 'static) -> Self {
        self.pre_parse = Some(Arc::new(hook));
        self
    }

    pub fn with_pre_forward(mut self, hook: impl PreForwardHook + 'static) -> Self {
        self.pre_forward = Some(Arc::new(hook));
        self
    }

    pub fn with_post_process(mut self, hook: impl PostProcessHook + 'static) -> Self {
        self.post_process = Some(Arc::new(hook));
        self
    }

    pub fn route(&self) -> &str {
        &self.endpoint.route
    }

    pub fn matches(&self, path: &str) -> bool {
        route_matches(&self.endpoint.route, path)
    }
}

pub struct HookRegistry {
    schedule: Arc<ForkSchedule>,
    routes: Vec<RouteHooks>,
}

impl HookRegistry {
    pub fn new(schedule: Arc<ForkSchedule>) -> Self {
        Self {
            schedule,
            routes: Vec::new(),
        }
    }

    /// Beacon API routes whose shapes differ between the REST surface and the backend.
    pub fn standard(schedule: Arc<ForkSchedule>) -> Result<Self, Error> {
        let mut registry = Self::new(schedule.clone());
        let routes = [
            RouteHooks::array::<FeeRecipientsRequest>("/eth/v1/validator/prepare_beacon_proposer"),
            RouteHooks::array::<SignedValidatorRegistrationsRequest>(
                "/eth/v1/validator/register_validator",
            ),
            RouteHooks::array::<SubmitAttestationsRequest>("/eth/v1/beacon/pool/attestations"),
            RouteHooks::array::<DutiesRequest>("/eth/v1/validator/duties/attester/{epoch}"),
            RouteHooks::array::<DutiesRequest>("/eth/v1/validator/duties/sync/{epoch}"),
            RouteHooks::array::<SubmitAggregateAndProofsRequest>(
                "/eth/v1/validator/aggregate_and_proofs",
            ),
            RouteHooks::array::<SubmitBeaconCommitteeSubscriptionsRequest>(
                "/eth/v1/validator/beacon_committee_subscriptions",
            ),
            RouteHooks::array::<SubmitSyncCommitteeSubscriptionsRequest>(
                "/eth/v1/validator/sync_committee_subscriptions",
            ),
            RouteHooks::array::<SubmitSyncCommitteeSignaturesRequest>(
                "/eth/v1/beacon/pool/sync_committees",
            ),
            RouteHooks::array::<SubmitContributionAndProofsRequest>(
                "/eth/v1/validator/contribution_and_proofs",
            ),
            RouteHooks::new(
                "/eth/v1/beacon/blocks",
                PayloadKind::UnresolvedBlock,
                ResponseKind::Passthrough,
            )
            .with_pre_parse(ResolvePublishedBlock::new(schedule.clone()))
            .with_pre_forward(PreparePublishedBlock::new()),
            RouteHooks::new(
                "/eth/v1/beacon/blinded_blocks",
                PayloadKind::UnresolvedBlock,
                ResponseKind::Passthrough,
            )
            .with_pre_parse(ResolvePublishedBlock::blinded(schedule))
            .with_pre_forward(PreparePublishedBlock::blinded()),
            RouteHooks::new(
                "/eth/v2/beacon/blocks/{block_id}",
                PayloadKind::Passthrough,
                ResponseKind::BlockV2,
            )
            .with_post_process(VersionedSerializer::new(VersionedShape::Block)),
            RouteHooks::new(
                "/eth/v2/debug/beacon/states/{state_id}",
                PayloadKind::Passthrough,
                ResponseKind::StateV2,
            )
            .with_post_process(VersionedSerializer::new(VersionedShape::State)),
            RouteHooks::new(
                "/eth/v2/validator/blocks/{slot}",
                PayloadKind::Passthrough,
                ResponseKind::ProduceBlockV2,
            )
            .with_post_process(VersionedSerializer::new(VersionedShape::ProduceBlock)),
            RouteHooks::new(
                "/eth/v1/validator/blinded_blocks/{slot}",
                PayloadKind::Passthrough,
                ResponseKind::ProduceBlindedBlock,
            )
            .with_post_process(VersionedSerializer::new(
                VersionedShape::ProduceBlindedBlock,
            )),
            RouteHooks::new(
                "/eth/v1/beacon/states/{state_id}/sync_committees",
                PayloadKind::Passthrough,
                ResponseKind::SyncCommittees,
            )
            .with_post_process(FlattenValidatorAggregates),
        ];
        for route in routes {
            registry.register(route)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, hooks: RouteHooks) -> Result<(), Error> {
        if self
            .routes
            .iter()
            .any(|existing| existing.endpoint.route == hooks.endpoint.route)
        {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("route registered twice")
                .with_route(hooks.endpoint.route.clone()));
        }
        self.routes.push(hooks);
        Ok(())
    }

    pub fn lookup(&self, path: &str) -> Result<&RouteHooks, Error> {
        self.routes
            .iter()
            .find(|hooks| hooks.matches(path))
            .ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message("no hooks registered for route")
                    .with_route(path)
                    .with_hint("Run `forkgate routes` to list registered routes.")
            })
    }

    pub fn routes(&self) -> &[RouteHooks] {
        &self.routes
    }

    pub fn schedule(&self) -> &Arc<ForkSchedule> {
        &self.schedule
    }
}

fn route_matches(template: &str, path: &str) -> bool {
    let path = path.split_once('?').map_or(path, |(path, _)| path);
    let mut expected = template.trim_end_matches('/').split('/');
    let mut actual = path.trim_end_matches('/').split('/');
    loop {
        match (expected.next(), actual.next()) {
            (None, None) => return true,
            (Some(want), Some(got)) => {
                let is_param = want.starts_with('{') && want.ends_with('}');
                if is_param {
                    if got.is_empty() {
                        return false;
                    }
                } else if want != got {
                    return false;
                }
            }
            _ => return false,
        }
    }
}
