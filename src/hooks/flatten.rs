//! Purpose: Flatten nested sync-committee aggregates into the API's 2D array shape.
//! Exports: `FlattenValidatorAggregates`.
//! Role: Post-process hook run on raw backend bytes before the default decode.
//! Invariants: Outer and inner order and lengths are preserved; inner lists are copies.

use serde::Deserialize;

use crate::core::error::{Error, ErrorKind};
use crate::core::response::{ResponseContainer, SyncCommitteeValidators};
use crate::hooks::{PostProcessHook, PostProcessOutcome, ResponseStage};
use crate::json::parse;

#[derive(Deserialize)]
struct NestedSyncCommitteesResponse {
    data: Option<NestedSyncCommitteeValidators>,
}

#[derive(Deserialize)]
struct NestedSyncCommitteeValidators {
    #[serde(default)]
    validators: Vec<String>,
    #[serde(default)]
    validator_aggregates: Vec<NestedSubcommittee>,
}

#[derive(Deserialize)]
struct NestedSubcommittee {
    #[serde(default)]
    validators: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FlattenValidatorAggregates;

impl PostProcessHook for FlattenValidatorAggregates {
    fn name(&self) -> &'static str {
        "prepare_validator_aggregates"
    }

    fn stage(&self) -> ResponseStage {
        ResponseStage::BeforeDecode
    }

    fn process(
        &self,
        raw: &[u8],
        container: &mut ResponseContainer,
    ) -> Result<PostProcessOutcome, Error> {
        let nested: NestedSyncCommitteesResponse =
            parse::from_slice(raw, "could not unmarshal response into temp container")?;
        let ResponseContainer::SyncCommittees(response) = container else {
            return Err(Error::new(ErrorKind::TypeMismatch)
                .with_message("container is not of the correct type"));
        };
        let Some(nested) = nested.data else {
            return Err(Error::new(ErrorKind::Decode)
                .with_message("could not unmarshal response into temp container")
                .with_hint("response has no data object"));
        };

        let validator_aggregates = nested
            .validator_aggregates
            .iter()
            .map(|subcommittee| subcommittee.validators.to_vec())
            .collect::<Vec<_>>();
        tracing::debug!(
            validators = nested.validators.len(),
            subcommittees = validator_aggregates.len(),
            "flattened validator aggregates"
        );
        response.data = Some(SyncCommitteeValidators {
            validators: nested.validators,
            validator_aggregates,
        });
        Ok(PostProcessOutcome::handled())
    }
}
