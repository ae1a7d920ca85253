//! Purpose: Re-serialize multi-version backend responses into flat, version-tagged API shapes.
//! Exports: `VersionedShape`, `VersionedSerializer`.
//! Role: Post-process hook that replaces the default serialization for block, state,
//! and block-production responses.
//! Invariants: The `version` tag is matched case-insensitively and echoed back unchanged.
//! Invariants: Output carries only the populated sub-object under `data`; no per-version keys.

use serde::Serialize;
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};
use crate::core::fork::ForkVersion;
use crate::core::response::{
    BlockUnion, BlockV2Response, ProduceBlockResponse, ResponseContainer, StateV2Response,
};
use crate::hooks::{PostProcessHook, PostProcessOutcome, ResponseStage};
use crate::json::parse;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VersionedShape {
    /// `{version, data: {message, signature}, execution_optimistic}`
    Block,
    /// `{version, data: <state>, execution_optimistic}`
    State,
    /// `{version, data: <block>}`
    ProduceBlock,
    /// Like `ProduceBlock`, with a blinded block from bellatrix on.
    ProduceBlindedBlock,
}

impl VersionedShape {
    fn subject(self) -> &'static str {
        match self {
            VersionedShape::State => "state",
            VersionedShape::Block
            | VersionedShape::ProduceBlock
            | VersionedShape::ProduceBlindedBlock => "block",
        }
    }
}

#[derive(Serialize)]
struct VersionedResponse<T> {
    version: String,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    execution_optimistic: Option<bool>,
}

#[derive(Serialize)]
struct SignedBlock {
    message: Value,
    signature: String,
}

pub struct VersionedSerializer {
    shape: VersionedShape,
}

impl VersionedSerializer {
    pub fn new(shape: VersionedShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> VersionedShape {
        self.shape
    }

    fn fork_for(&self, version: &str) -> Result<ForkVersion, Error> {
        ForkVersion::parse(version).ok_or_else(|| {
            Error::new(ErrorKind::UnsupportedVersion).with_message(format!(
                "unsupported {} version '{version}'",
                self.shape.subject()
            ))
        })
    }

    fn serialize_block(&self, response: &mut BlockV2Response) -> Result<bytes::Bytes, Error> {
        let fork = self.fork_for(&response.version)?;
        let data = response.data.take().unwrap_or_default();
        let (message, field) = match fork {
            ForkVersion::Phase0 => (data.phase0_block, "phase0_block"),
            ForkVersion::Altair => (data.altair_block, "altair_block"),
            ForkVersion::Bellatrix => (data.bellatrix_block, "bellatrix_block"),
        };
        let flat = VersionedResponse {
            version: std::mem::take(&mut response.version),
            data: SignedBlock {
                message: populated(message, field)?,
                signature: data.signature,
            },
            execution_optimistic: Some(response.execution_optimistic),
        };
        parse::to_bytes(&flat, "could not marshal response")
    }

    fn serialize_state(&self, response: &mut StateV2Response) -> Result<bytes::Bytes, Error> {
        let fork = self.fork_for(&response.version)?;
        let data = response.data.take().unwrap_or_default();
        let (state, field) = match fork {
            ForkVersion::Phase0 => (data.phase0_state, "phase0_state"),
            ForkVersion::Altair => (data.altair_state, "altair_state"),
            ForkVersion::Bellatrix => (data.bellatrix_state, "bellatrix_state"),
        };
        let flat = VersionedResponse {
            version: std::mem::take(&mut response.version),
            data: populated(state, field)?,
            execution_optimistic: Some(response.execution_optimistic),
        };
        parse::to_bytes(&flat, "could not marshal response")
    }

    fn serialize_produced(
        &self,
        response: &mut ProduceBlockResponse,
        blinded: bool,
    ) -> Result<bytes::Bytes, Error> {
        let fork = self.fork_for(&response.version)?;
        let BlockUnion {
            phase0_block,
            altair_block,
            bellatrix_block,
        } = response.data.take().unwrap_or_default();
        // Blinding starts at bellatrix; earlier forks reuse the full block shape.
        let (block, field) = match fork {
            ForkVersion::Phase0 => (phase0_block, "phase0_block"),
            ForkVersion::Altair => (altair_block, "altair_block"),
            ForkVersion::Bellatrix => (bellatrix_block, "bellatrix_block"),
        };
        tracing::trace!(blinded, %fork, "serializing produced block");
        let flat = VersionedResponse {
            version: std::mem::take(&mut response.version),
            data: populated(block, field)?,
            execution_optimistic: None,
        };
        parse::to_bytes(&flat, "could not marshal response")
    }
}

fn populated(value: Option<Value>, field: &str) -> Result<Value, Error> {
    value.ok_or_else(|| {
        Error::new(ErrorKind::Decode)
            .with_message(format!("response data has no {field} object"))
            .with_hint("The version tag and the populated sub-object disagree.")
    })
}

impl PostProcessHook for VersionedSerializer {
    fn name(&self) -> &'static str {
        match self.shape {
            VersionedShape::Block => "serialize_v2_block",
            VersionedShape::State => "serialize_v2_state",
            VersionedShape::ProduceBlock => "serialize_produced_v2_block",
            VersionedShape::ProduceBlindedBlock => "serialize_produced_blinded_block",
        }
    }

    fn stage(&self) -> ResponseStage {
        ResponseStage::BeforeSerialize
    }

    fn process(
        &self,
        _raw: &[u8],
        container: &mut ResponseContainer,
    ) -> Result<PostProcessOutcome, Error> {
        let body = match (self.shape, container) {
            (VersionedShape::Block, ResponseContainer::BlockV2(response)) => {
                self.serialize_block(response)?
            }
            (VersionedShape::State, ResponseContainer::StateV2(response)) => {
                self.serialize_state(response)?
            }
            (VersionedShape::ProduceBlock, ResponseContainer::ProduceBlockV2(response)) => {
                self.serialize_produced(response, false)?
            }
            (
                VersionedShape::ProduceBlindedBlock,
                ResponseContainer::ProduceBlindedBlock(response),
            ) => self.serialize_produced(response, true)?,
            (_, other) => {
                return Err(Error::new(ErrorKind::TypeMismatch)
                    .with_message("container is not of the correct type")
                    .with_hint(format!(
                        "{} cannot serialize a {} container",
                        self.name(),
                        other.kind().name()
                    )));
            }
        };
        tracing::debug!(hook = self.name(), bytes = body.len(), "serialized versioned response");
        Ok(PostProcessOutcome::replace(body))
    }
}

#[cfg(test)]
mod tests {
    use super::{VersionedSerializer, VersionedShape};
    use crate::core::error::ErrorKind;
    use crate::core::response::{ResponseContainer, ResponseKind};
    use crate::hooks::PostProcessHook;
    use serde_json::{Value, json};

    fn run(shape: VersionedShape, kind: ResponseKind, raw: Value) -> Result<Value, crate::core::error::Error> {
        let raw = raw.to_string().into_bytes();
        let mut container = kind.decode(&raw)?;
        let outcome = VersionedSerializer::new(shape).process(&raw, &mut container)?;
        assert!(!outcome.run_default);
        let body = outcome.body.expect("replacement body");
        Ok(serde_json::from_slice(&body).expect("json output"))
    }

    #[test]
    fn block_output_is_flat_for_every_version_and_case() {
        for (version, field) in [
            ("phase0", "phase0_block"),
            ("ALTAIR", "altair_block"),
            ("BeLLaTrIx", "bellatrix_block"),
        ] {
            let raw = json!({
                "version": version,
                "data": {field: {"slot": "9"}, "signature": "0x99"},
                "execution_optimistic": true
            });
            let out = run(VersionedShape::Block, ResponseKind::BlockV2, raw).expect("serialize");
            assert_eq!(
                out,
                json!({
                    "version": version,
                    "data": {"message": {"slot": "9"}, "signature": "0x99"},
                    "execution_optimistic": true
                })
            );
        }
    }

    #[test]
    fn state_output_copies_the_populated_state() {
        let raw = json!({
            "version": "BELLATRIX",
            "data": {"bellatrix_state": {"genesis_time": "1"}},
            "execution_optimistic": false
        });
        let out = run(VersionedShape::State, ResponseKind::StateV2, raw).expect("serialize");
        assert_eq!(
            out,
            json!({
                "version": "BELLATRIX",
                "data": {"genesis_time": "1"},
                "execution_optimistic": false
            })
        );
        assert!(out["data"].get("phase0_state").is_none());
    }

    #[test]
    fn produced_blocks_omit_execution_optimistic() {
        let raw = json!({"version": "altair", "data": {"altair_block": {"slot": "3"}}});
        let out = run(VersionedShape::ProduceBlock, ResponseKind::ProduceBlockV2, raw)
            .expect("serialize");
        assert_eq!(out, json!({"version": "altair", "data": {"slot": "3"}}));
    }

    #[test]
    fn blinded_production_falls_back_to_full_shapes_before_bellatrix() {
        let raw = json!({"version": "phase0", "data": {"phase0_block": {"slot": "1"}}});
        let out = run(
            VersionedShape::ProduceBlindedBlock,
            ResponseKind::ProduceBlindedBlock,
            raw,
        )
        .expect("serialize");
        assert_eq!(out, json!({"version": "phase0", "data": {"slot": "1"}}));

        let blinded = json!({"slot": "2", "body": {"execution_payload_header": {}}});
        let raw = json!({"version": "bellatrix", "data": {"bellatrix_block": blinded}});
        let out = run(
            VersionedShape::ProduceBlindedBlock,
            ResponseKind::ProduceBlindedBlock,
            raw,
        )
        .expect("serialize");
        assert_eq!(out["data"], blinded);
    }

    #[test]
    fn unknown_version_is_unsupported() {
        let raw = json!({"version": "capella", "data": {}, "execution_optimistic": false});
        let err = run(VersionedShape::Block, ResponseKind::BlockV2, raw).expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
        assert_eq!(err.message(), Some("unsupported block version 'capella'"));

        let raw = json!({"version": "", "data": {}});
        let err = run(VersionedShape::State, ResponseKind::StateV2, raw).expect_err("expected error");
        assert_eq!(err.message(), Some("unsupported state version ''"));
    }

    #[test]
    fn wrong_container_is_a_type_mismatch() {
        let mut container = ResponseContainer::Passthrough(json!({}));
        let err = VersionedSerializer::new(VersionedShape::Block)
            .process(b"{}", &mut container)
            .expect_err("expected type mismatch");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.message(), Some("container is not of the correct type"));
    }

    #[test]
    fn version_without_matching_sub_object_is_rejected() {
        let raw = json!({"version": "altair", "data": {"phase0_block": {}}});
        let err = run(VersionedShape::ProduceBlock, ResponseKind::ProduceBlockV2, raw)
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
