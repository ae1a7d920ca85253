//! Purpose: Define the stable public Rust API boundary for forkgate.
//! Exports: Pipeline, registry, hook contracts, config, and error types.
//! Role: Public, additive-only surface used by the CLI, the HTTP sidecar, and embedders.
//! Invariants: Embedders register routes and drive hooks only through these types.

mod pipeline;
mod registry;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::config::{ChainConfig, ChainConfigOverrides, Network};
pub use crate::core::endpoint::{Endpoint, PublishState, RequestContext};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::fork::{ForkBoundary, ForkSchedule, ForkVersion, SlotField};
pub use crate::core::payload::{BlockVariant, ListKind, PayloadKind, PostRequest};
pub use crate::core::response::{ResponseContainer, ResponseKind};
pub use crate::hooks::{
    PostProcessHook, PostProcessOutcome, PreForwardHook, PreParseHook, ResponseStage, RunDefault,
};
pub use pipeline::Pipeline;
pub use registry::{HookRegistry, RouteHooks};
