//! Purpose: Request-side wire shapes exchanged with the backend.
//! Exports: list elements and their single-field wrappers, `ArrayWrapper`, `ListKind`,
//! `BlockVariant`, `SignedBlockContainer`, `PublishBlockRequest`, `PayloadKind`, `PostRequest`.
//! Role: Typed targets for the generic request parser and the envelope hooks.
//! Invariants: JSON field names are exact snake_case API names.
//! Invariants: Block messages stay opaque (`Value`); only their envelope is reshaped.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};
use crate::core::fork::ForkVersion;
use crate::json::parse;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeeRecipient {
    pub validator_index: String,
    pub fee_recipient: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ValidatorRegistration {
    pub fee_recipient: String,
    pub gas_limit: String,
    pub timestamp: String,
    pub pubkey: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SignedValidatorRegistration {
    pub message: Option<ValidatorRegistration>,
    pub signature: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Checkpoint {
    pub epoch: String,
    pub root: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AttestationData {
    pub slot: String,
    pub index: String,
    pub beacon_block_root: String,
    pub source: Option<Checkpoint>,
    pub target: Option<Checkpoint>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Attestation {
    pub aggregation_bits: String,
    pub data: Option<AttestationData>,
    pub signature: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AggregateAttestationAndProof {
    pub aggregator_index: String,
    pub aggregate: Option<Attestation>,
    pub selection_proof: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SignedAggregateAttestationAndProof {
    pub message: Option<AggregateAttestationAndProof>,
    pub signature: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BeaconCommitteeSubscription {
    pub validator_index: String,
    pub committee_index: String,
    pub committees_at_slot: String,
    pub slot: String,
    pub is_aggregator: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncCommitteeSubscription {
    pub validator_index: String,
    pub sync_committee_indices: Vec<String>,
    pub until_epoch: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncCommitteeMessage {
    pub slot: String,
    pub beacon_block_root: String,
    pub validator_index: String,
    pub signature: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncCommitteeContribution {
    pub slot: String,
    pub beacon_block_root: String,
    pub subcommittee_index: String,
    pub aggregation_bits: String,
    pub signature: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContributionAndProof {
    pub aggregator_index: String,
    pub contribution: Option<SyncCommitteeContribution>,
    pub selection_proof: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SignedContributionAndProof {
    pub message: Option<ContributionAndProof>,
    pub signature: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct FeeRecipientsRequest {
    pub recipients: Vec<FeeRecipient>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SignedValidatorRegistrationsRequest {
    pub registrations: Vec<SignedValidatorRegistration>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubmitAttestationsRequest {
    pub data: Vec<Attestation>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DutiesRequest {
    pub index: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubmitAggregateAndProofsRequest {
    pub data: Vec<SignedAggregateAttestationAndProof>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubmitBeaconCommitteeSubscriptionsRequest {
    pub data: Vec<BeaconCommitteeSubscription>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubmitSyncCommitteeSubscriptionsRequest {
    pub data: Vec<SyncCommitteeSubscription>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubmitSyncCommitteeSignaturesRequest {
    pub data: Vec<SyncCommitteeMessage>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubmitContributionAndProofsRequest {
    pub data: Vec<SignedContributionAndProof>,
}

/// Which list-shaped payload a route carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ListKind {
    FeeRecipients,
    ValidatorRegistrations,
    Attestations,
    ValidatorIndices,
    AggregateAndProofs,
    BeaconCommitteeSubscriptions,
    SyncCommitteeSubscriptions,
    SyncCommitteeSignatures,
    ContributionAndProofs,
}

impl ListKind {
    pub fn name(self) -> &'static str {
        match self {
            ListKind::FeeRecipients => "fee_recipients",
            ListKind::ValidatorRegistrations => "validator_registrations",
            ListKind::Attestations => "attestations",
            ListKind::ValidatorIndices => "validator_indices",
            ListKind::AggregateAndProofs => "aggregate_and_proofs",
            ListKind::BeaconCommitteeSubscriptions => "beacon_committee_subscriptions",
            ListKind::SyncCommitteeSubscriptions => "sync_committee_subscriptions",
            ListKind::SyncCommitteeSignatures => "sync_committee_signatures",
            ListKind::ContributionAndProofs => "contribution_and_proofs",
        }
    }

    /// Decodes an already-wrapped body into its wrapper type.
    fn decode(self, body: &[u8]) -> Result<PostRequest, Error> {
        match self {
            ListKind::FeeRecipients => decode_wrapper::<FeeRecipientsRequest>(body),
            ListKind::ValidatorRegistrations => {
                decode_wrapper::<SignedValidatorRegistrationsRequest>(body)
            }
            ListKind::Attestations => decode_wrapper::<SubmitAttestationsRequest>(body),
            ListKind::ValidatorIndices => decode_wrapper::<DutiesRequest>(body),
            ListKind::AggregateAndProofs => decode_wrapper::<SubmitAggregateAndProofsRequest>(body),
            ListKind::BeaconCommitteeSubscriptions => {
                decode_wrapper::<SubmitBeaconCommitteeSubscriptionsRequest>(body)
            }
            ListKind::SyncCommitteeSubscriptions => {
                decode_wrapper::<SubmitSyncCommitteeSubscriptionsRequest>(body)
            }
            ListKind::SyncCommitteeSignatures => {
                decode_wrapper::<SubmitSyncCommitteeSignaturesRequest>(body)
            }
            ListKind::ContributionAndProofs => {
                decode_wrapper::<SubmitContributionAndProofsRequest>(body)
            }
        }
    }
}

fn decode_wrapper<W: ArrayWrapper>(body: &[u8]) -> Result<PostRequest, Error> {
    parse::from_slice::<W>(body, "could not decode body").map(W::into_request)
}

/// A single-field object wrapping a list the public API posts as a bare array.
pub trait ArrayWrapper: Serialize + DeserializeOwned + Sized {
    type Element: Serialize + DeserializeOwned;

    const KIND: ListKind;
    const FIELD: &'static str;

    fn from_elements(elements: Vec<Self::Element>) -> Self;
    fn elements(&self) -> &[Self::Element];
    fn into_request(self) -> PostRequest;
}

impl ArrayWrapper for FeeRecipientsRequest {
    type Element = FeeRecipient;
    const KIND: ListKind = ListKind::FeeRecipients;
    const FIELD: &'static str = "recipients";

    fn from_elements(recipients: Vec<FeeRecipient>) -> Self {
        Self { recipients }
    }

    fn elements(&self) -> &[FeeRecipient] {
        &self.recipients
    }

    fn into_request(self) -> PostRequest {
        PostRequest::FeeRecipients(self)
    }
}

impl ArrayWrapper for SignedValidatorRegistrationsRequest {
    type Element = SignedValidatorRegistration;
    const KIND: ListKind = ListKind::ValidatorRegistrations;
    const FIELD: &'static str = "registrations";

    fn from_elements(registrations: Vec<SignedValidatorRegistration>) -> Self {
        Self { registrations }
    }

    fn elements(&self) -> &[SignedValidatorRegistration] {
        &self.registrations
    }

    fn into_request(self) -> PostRequest {
        PostRequest::ValidatorRegistrations(self)
    }
}

impl ArrayWrapper for SubmitAttestationsRequest {
    type Element = Attestation;
    const KIND: ListKind = ListKind::Attestations;
    const FIELD: &'static str = "data";

    fn from_elements(data: Vec<Attestation>) -> Self {
        Self { data }
    }

    fn elements(&self) -> &[Attestation] {
        &self.data
    }

    fn into_request(self) -> PostRequest {
        PostRequest::Attestations(self)
    }
}

impl ArrayWrapper for DutiesRequest {
    type Element = String;
    const KIND: ListKind = ListKind::ValidatorIndices;
    const FIELD: &'static str = "index";

    fn from_elements(index: Vec<String>) -> Self {
        Self { index }
    }

    fn elements(&self) -> &[String] {
        &self.index
    }

    fn into_request(self) -> PostRequest {
        PostRequest::ValidatorIndices(self)
    }
}

impl ArrayWrapper for SubmitAggregateAndProofsRequest {
    type Element = SignedAggregateAttestationAndProof;
    const KIND: ListKind = ListKind::AggregateAndProofs;
    const FIELD: &'static str = "data";

    fn from_elements(data: Vec<SignedAggregateAttestationAndProof>) -> Self {
        Self { data }
    }

    fn elements(&self) -> &[SignedAggregateAttestationAndProof] {
        &self.data
    }

    fn into_request(self) -> PostRequest {
        PostRequest::AggregateAndProofs(self)
    }
}

impl ArrayWrapper for SubmitBeaconCommitteeSubscriptionsRequest {
    type Element = BeaconCommitteeSubscription;
    const KIND: ListKind = ListKind::BeaconCommitteeSubscriptions;
    const FIELD: &'static str = "data";

    fn from_elements(data: Vec<BeaconCommitteeSubscription>) -> Self {
        Self { data }
    }

    fn elements(&self) -> &[BeaconCommitteeSubscription] {
        &self.data
    }

    fn into_request(self) -> PostRequest {
        PostRequest::BeaconCommitteeSubscriptions(self)
    }
}

impl ArrayWrapper for SubmitSyncCommitteeSubscriptionsRequest {
    type Element = SyncCommitteeSubscription;
    const KIND: ListKind = ListKind::SyncCommitteeSubscriptions;
    const FIELD: &'static str = "data";

    fn from_elements(data: Vec<SyncCommitteeSubscription>) -> Self {
        Self { data }
    }

    fn elements(&self) -> &[SyncCommitteeSubscription] {
        &self.data
    }

    fn into_request(self) -> PostRequest {
        PostRequest::SyncCommitteeSubscriptions(self)
    }
}

impl ArrayWrapper for SubmitSyncCommitteeSignaturesRequest {
    type Element = SyncCommitteeMessage;
    const KIND: ListKind = ListKind::SyncCommitteeSignatures;
    const FIELD: &'static str = "data";

    fn from_elements(data: Vec<SyncCommitteeMessage>) -> Self {
        Self { data }
    }

    fn elements(&self) -> &[SyncCommitteeMessage] {
        &self.data
    }

    fn into_request(self) -> PostRequest {
        PostRequest::SyncCommitteeSignatures(self)
    }
}

impl ArrayWrapper for SubmitContributionAndProofsRequest {
    type Element = SignedContributionAndProof;
    const KIND: ListKind = ListKind::ContributionAndProofs;
    const FIELD: &'static str = "data";

    fn from_elements(data: Vec<SignedContributionAndProof>) -> Self {
        Self { data }
    }

    fn elements(&self) -> &[SignedContributionAndProof] {
        &self.data
    }

    fn into_request(self) -> PostRequest {
        PostRequest::ContributionAndProofs(self)
    }
}

/// Signed block container variants accepted on the publish routes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BlockVariant {
    Phase0,
    Altair,
    Bellatrix,
    BlindedBellatrix,
}

impl BlockVariant {
    /// Blinding only exists from bellatrix on; earlier forks use the plain container.
    pub fn for_fork(fork: ForkVersion, blinded: bool) -> Self {
        match fork {
            ForkVersion::Phase0 => BlockVariant::Phase0,
            ForkVersion::Altair => BlockVariant::Altair,
            ForkVersion::Bellatrix if blinded => BlockVariant::BlindedBellatrix,
            ForkVersion::Bellatrix => BlockVariant::Bellatrix,
        }
    }

    pub fn fork(self) -> ForkVersion {
        match self {
            BlockVariant::Phase0 => ForkVersion::Phase0,
            BlockVariant::Altair => ForkVersion::Altair,
            BlockVariant::Bellatrix | BlockVariant::BlindedBellatrix => ForkVersion::Bellatrix,
        }
    }

    /// Backend field name carrying the block message.
    pub fn field(self) -> &'static str {
        match self {
            BlockVariant::Phase0 => "phase0_block",
            BlockVariant::Altair => "altair_block",
            BlockVariant::Bellatrix | BlockVariant::BlindedBellatrix => "bellatrix_block",
        }
    }
}

/// `{"message": <block>, "signature": "0x.."}` as posted by API clients.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SignedBlockContainer {
    pub message: Value,
    pub signature: String,
}

/// Version-specific publish body the backend decodes.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum PublishBlockRequest {
    Phase0 {
        phase0_block: Value,
        signature: String,
    },
    Altair {
        altair_block: Value,
        signature: String,
    },
    Bellatrix {
        bellatrix_block: Value,
        signature: String,
    },
    BlindedBellatrix {
        bellatrix_block: Value,
        signature: String,
    },
}

impl PublishBlockRequest {
    pub fn new(variant: BlockVariant, container: SignedBlockContainer) -> Self {
        let SignedBlockContainer { message, signature } = container;
        match variant {
            BlockVariant::Phase0 => PublishBlockRequest::Phase0 {
                phase0_block: message,
                signature,
            },
            BlockVariant::Altair => PublishBlockRequest::Altair {
                altair_block: message,
                signature,
            },
            BlockVariant::Bellatrix => PublishBlockRequest::Bellatrix {
                bellatrix_block: message,
                signature,
            },
            BlockVariant::BlindedBellatrix => PublishBlockRequest::BlindedBellatrix {
                bellatrix_block: message,
                signature,
            },
        }
    }

    pub fn variant(&self) -> BlockVariant {
        match self {
            PublishBlockRequest::Phase0 { .. } => BlockVariant::Phase0,
            PublishBlockRequest::Altair { .. } => BlockVariant::Altair,
            PublishBlockRequest::Bellatrix { .. } => BlockVariant::Bellatrix,
            PublishBlockRequest::BlindedBellatrix { .. } => BlockVariant::BlindedBellatrix,
        }
    }
}

/// The type the generic parser decodes a request body into.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PayloadKind {
    /// Any JSON; forwarded unchanged.
    Passthrough,
    List(ListKind),
    /// A publish route whose block version has not been resolved yet.
    UnresolvedBlock,
    SignedBlock(BlockVariant),
}

impl PayloadKind {
    pub fn name(self) -> &'static str {
        match self {
            PayloadKind::Passthrough => "passthrough",
            PayloadKind::List(kind) => kind.name(),
            PayloadKind::UnresolvedBlock => "signed_block",
            PayloadKind::SignedBlock(BlockVariant::BlindedBellatrix) => "signed_blinded_block",
            PayloadKind::SignedBlock(_) => "signed_block",
        }
    }

    pub fn decode(self, body: &[u8]) -> Result<PostRequest, Error> {
        match self {
            PayloadKind::Passthrough => {
                parse::from_slice(body, "could not decode body").map(PostRequest::Passthrough)
            }
            PayloadKind::List(kind) => kind.decode(body),
            PayloadKind::UnresolvedBlock => Err(Error::new(ErrorKind::Internal)
                .with_message("block version has not been resolved")
                .with_hint("Publish routes need their pre-parse hook registered.")),
            PayloadKind::SignedBlock(variant) => {
                parse::from_slice::<SignedBlockContainer>(body, "could not decode body")
                    .map(|container| PostRequest::SignedBlock(variant, container))
            }
        }
    }
}

/// A decoded request payload, shaped by the route's `PayloadKind`.
#[derive(Clone, Debug, PartialEq)]
pub enum PostRequest {
    Passthrough(Value),
    FeeRecipients(FeeRecipientsRequest),
    ValidatorRegistrations(SignedValidatorRegistrationsRequest),
    Attestations(SubmitAttestationsRequest),
    ValidatorIndices(DutiesRequest),
    AggregateAndProofs(SubmitAggregateAndProofsRequest),
    BeaconCommitteeSubscriptions(SubmitBeaconCommitteeSubscriptionsRequest),
    SyncCommitteeSubscriptions(SubmitSyncCommitteeSubscriptionsRequest),
    SyncCommitteeSignatures(SubmitSyncCommitteeSignaturesRequest),
    ContributionAndProofs(SubmitContributionAndProofsRequest),
    SignedBlock(BlockVariant, SignedBlockContainer),
    PublishBlock(PublishBlockRequest),
}

impl PostRequest {
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        const MESSAGE: &str = "could not marshal request";
        match self {
            PostRequest::Passthrough(value) => parse::to_bytes(value, MESSAGE),
            PostRequest::FeeRecipients(request) => parse::to_bytes(request, MESSAGE),
            PostRequest::ValidatorRegistrations(request) => parse::to_bytes(request, MESSAGE),
            PostRequest::Attestations(request) => parse::to_bytes(request, MESSAGE),
            PostRequest::ValidatorIndices(request) => parse::to_bytes(request, MESSAGE),
            PostRequest::AggregateAndProofs(request) => parse::to_bytes(request, MESSAGE),
            PostRequest::BeaconCommitteeSubscriptions(request) => parse::to_bytes(request, MESSAGE),
            PostRequest::SyncCommitteeSubscriptions(request) => parse::to_bytes(request, MESSAGE),
            PostRequest::SyncCommitteeSignatures(request) => parse::to_bytes(request, MESSAGE),
            PostRequest::ContributionAndProofs(request) => parse::to_bytes(request, MESSAGE),
            PostRequest::SignedBlock(_, container) => parse::to_bytes(container, MESSAGE),
            PostRequest::PublishBlock(request) => parse::to_bytes(request, MESSAGE),
        }
    }
}
