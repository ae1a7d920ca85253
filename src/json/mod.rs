//! Purpose: Internal JSON decode/encode boundary shared by hooks and the pipeline.
//! Exports: `parse` module with decode helpers.
//! Role: Single seam for serde_json usage so callsites avoid ad hoc error mapping.
//! Invariants: Every transcoding decode/encode goes through this module.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub(crate) mod parse;
