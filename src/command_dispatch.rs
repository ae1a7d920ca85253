//! Purpose: Execute parsed CLI commands against the transcoding pipeline.
//! Role: Builds the fork schedule and hook registry once, then runs one command.
//! Invariants: Chain configuration is validated before any hook runs.

use super::*;

use std::sync::Arc;

use forkgate::api::{ChainConfig, ForkSchedule, HookRegistry, Pipeline};
use crate::route_info_json::{fork_json, routes_json};

pub(super) fn dispatch_command(command: Command, chain: ChainArgs) -> Result<RunOutcome, Error> {
    let schedule = load_schedule(&chain)?;
    match command {
        Command::Request { route, file } => {
            let pipeline = build_pipeline(schedule)?;
            let body = read_input(file.as_deref())?;
            let out = pipeline.transcode_request(&route, body)?;
            emit_body(&out)?;
            Ok(RunOutcome::ok())
        }
        Command::Response { route, file } => {
            let pipeline = build_pipeline(schedule)?;
            let raw = read_input(file.as_deref())?;
            let out = pipeline.transcode_response(&route, &raw)?;
            emit_body(&out)?;
            Ok(RunOutcome::ok())
        }
        Command::Fork { slot } => {
            emit_json(fork_json(&schedule, slot));
            Ok(RunOutcome::ok())
        }
        Command::Routes => {
            let registry = HookRegistry::standard(schedule)?;
            emit_json(routes_json(&registry));
            Ok(RunOutcome::ok())
        }
        Command::Serve { run } => {
            let config = serve::ServeConfig {
                bind: run.bind,
                allow_non_loopback: run.allow_non_loopback,
                max_body_bytes: run.max_body_bytes,
            };
            let pipeline = build_pipeline(schedule)?;
            tracing::info!(
                network = chain.network().name(),
                bind = %config.bind,
                "starting transcoding sidecar"
            );
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config, pipeline))?;
            Ok(RunOutcome::ok())
        }
    }
}

fn load_schedule(chain: &ChainArgs) -> Result<Arc<ForkSchedule>, Error> {
    let config = ChainConfig::preset(chain.network()).apply(&chain.overrides()?);
    let schedule = ForkSchedule::new(&config)?;
    tracing::debug!(
        network = chain.network().name(),
        slots_per_epoch = config.slots_per_epoch,
        altair_fork_epoch = config.altair_fork_epoch,
        bellatrix_fork_epoch = config.bellatrix_fork_epoch,
        "loaded fork schedule"
    );
    Ok(Arc::new(schedule))
}

fn build_pipeline(schedule: Arc<ForkSchedule>) -> Result<Pipeline, Error> {
    Ok(Pipeline::new(HookRegistry::standard(schedule)?))
}
