//! Purpose: Response-side wire shapes produced by the backend.
//! Exports: generic multi-version containers, sync-committee shapes, `ResponseKind`,
//! `ResponseContainer`.
//! Role: Destination containers for the default response decode and post-process hooks.
//! Invariants: Multi-version containers carry a `version` tag and populate exactly one
//! per-version sub-object.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::Error;
use crate::json::parse;

/// `data` of a block response: one populated block plus the shared signature.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SignedBlockUnion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase0_block: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altair_block: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bellatrix_block: Option<Value>,
    pub signature: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BlockUnion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase0_block: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altair_block: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bellatrix_block: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StateUnion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase0_state: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altair_state: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bellatrix_state: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BlockV2Response {
    pub version: String,
    pub data: Option<SignedBlockUnion>,
    pub execution_optimistic: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StateV2Response {
    pub version: String,
    pub data: Option<StateUnion>,
    pub execution_optimistic: bool,
}

/// Shared by the full and blinded production routes; `ResponseKind` tells them apart.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProduceBlockResponse {
    pub version: String,
    pub data: Option<BlockUnion>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncCommitteeValidators {
    pub validators: Vec<String>,
    pub validator_aggregates: Vec<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncCommitteesResponse {
    pub data: Option<SyncCommitteeValidators>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseKind {
    Passthrough,
    BlockV2,
    StateV2,
    ProduceBlockV2,
    ProduceBlindedBlock,
    SyncCommittees,
}

impl ResponseKind {
    pub fn name(self) -> &'static str {
        match self {
            ResponseKind::Passthrough => "passthrough",
            ResponseKind::BlockV2 => "block_v2",
            ResponseKind::StateV2 => "state_v2",
            ResponseKind::ProduceBlockV2 => "produce_block_v2",
            ResponseKind::ProduceBlindedBlock => "produce_blinded_block",
            ResponseKind::SyncCommittees => "sync_committees",
        }
    }

    pub fn empty(self) -> ResponseContainer {
        match self {
            ResponseKind::Passthrough => ResponseContainer::Passthrough(Value::Null),
            ResponseKind::BlockV2 => ResponseContainer::BlockV2(BlockV2Response::default()),
            ResponseKind::StateV2 => ResponseContainer::StateV2(StateV2Response::default()),
            ResponseKind::ProduceBlockV2 => {
                ResponseContainer::ProduceBlockV2(ProduceBlockResponse::default())
            }
            ResponseKind::ProduceBlindedBlock => {
                ResponseContainer::ProduceBlindedBlock(ProduceBlockResponse::default())
            }
            ResponseKind::SyncCommittees => {
                ResponseContainer::SyncCommittees(SyncCommitteesResponse::default())
            }
        }
    }

    /// Default decode of raw backend bytes into this kind's container.
    pub fn decode(self, raw: &[u8]) -> Result<ResponseContainer, Error> {
        const MESSAGE: &str = "could not unmarshal response";
        let container = match self {
            ResponseKind::Passthrough => ResponseContainer::Passthrough(parse::from_slice(raw, MESSAGE)?),
            ResponseKind::BlockV2 => ResponseContainer::BlockV2(parse::from_slice(raw, MESSAGE)?),
            ResponseKind::StateV2 => ResponseContainer::StateV2(parse::from_slice(raw, MESSAGE)?),
            ResponseKind::ProduceBlockV2 => {
                ResponseContainer::ProduceBlockV2(parse::from_slice(raw, MESSAGE)?)
            }
            ResponseKind::ProduceBlindedBlock => {
                ResponseContainer::ProduceBlindedBlock(parse::from_slice(raw, MESSAGE)?)
            }
            ResponseKind::SyncCommittees => {
                ResponseContainer::SyncCommittees(parse::from_slice(raw, MESSAGE)?)
            }
        };
        Ok(container)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResponseContainer {
    Passthrough(Value),
    BlockV2(BlockV2Response),
    StateV2(StateV2Response),
    ProduceBlockV2(ProduceBlockResponse),
    ProduceBlindedBlock(ProduceBlockResponse),
    SyncCommittees(SyncCommitteesResponse),
}

impl ResponseContainer {
    pub fn kind(&self) -> ResponseKind {
        match self {
            ResponseContainer::Passthrough(_) => ResponseKind::Passthrough,
            ResponseContainer::BlockV2(_) => ResponseKind::BlockV2,
            ResponseContainer::StateV2(_) => ResponseKind::StateV2,
            ResponseContainer::ProduceBlockV2(_) => ResponseKind::ProduceBlockV2,
            ResponseContainer::ProduceBlindedBlock(_) => ResponseKind::ProduceBlindedBlock,
            ResponseContainer::SyncCommittees(_) => ResponseKind::SyncCommittees,
        }
    }

    /// Default serialization, used when no hook supplied replacement bytes.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        const MESSAGE: &str = "could not marshal response";
        match self {
            ResponseContainer::Passthrough(value) => parse::to_bytes(value, MESSAGE),
            ResponseContainer::BlockV2(response) => parse::to_bytes(response, MESSAGE),
            ResponseContainer::StateV2(response) => parse::to_bytes(response, MESSAGE),
            ResponseContainer::ProduceBlockV2(response)
            | ResponseContainer::ProduceBlindedBlock(response) => parse::to_bytes(response, MESSAGE),
            ResponseContainer::SyncCommittees(response) => parse::to_bytes(response, MESSAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ResponseContainer, ResponseKind};
    use crate::core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn block_response_decodes_single_populated_variant() {
        let raw = json!({
            "version": "ALTAIR",
            "data": {"altair_block": {"slot": "5"}, "signature": "0x01"},
            "execution_optimistic": false
        });
        let container = ResponseKind::BlockV2
            .decode(raw.to_string().as_bytes())
            .expect("decode");
        let ResponseContainer::BlockV2(response) = container else {
            panic!("unexpected container");
        };
        let data = response.data.expect("data");
        assert_eq!(data.altair_block, Some(json!({"slot": "5"})));
        assert!(data.phase0_block.is_none());
        assert!(data.bellatrix_block.is_none());
    }

    #[test]
    fn empty_containers_report_their_kind() {
        for kind in [
            ResponseKind::Passthrough,
            ResponseKind::BlockV2,
            ResponseKind::StateV2,
            ResponseKind::ProduceBlockV2,
            ResponseKind::ProduceBlindedBlock,
            ResponseKind::SyncCommittees,
        ] {
            assert_eq!(kind.empty().kind(), kind);
        }
    }

    #[test]
    fn malformed_backend_bytes_are_decode_errors() {
        let err = ResponseKind::StateV2
            .decode(b"{\"version\":")
            .expect_err("expected decode error");
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
