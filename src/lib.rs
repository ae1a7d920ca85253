//! Purpose: Library crate behind the `forkgate` CLI and HTTP sidecar.
//! Exports: `api` (pipeline, registry, config, errors), `core` (wire shapes, fork
//! resolution), `hooks` (the transcoding hooks).
//! Role: Fork-aware JSON shape translation between the Beacon REST API and the backend.
//! Invariants: Hooks are pure functions of their request/response plus the fork schedule.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
pub mod hooks;
mod json;
