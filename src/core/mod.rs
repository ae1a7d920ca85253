// Core modules: configuration, fork resolution, wire shapes, and error modeling.
pub mod config;
pub mod endpoint;
pub mod error;
pub mod fork;
pub mod payload;
pub mod response;
