//! # cpudex
//!
//! Application layer for the cpudex CPU specification catalog: the axum HTTP
//! server, the clap CLI and the access gate. All record logic lives in
//! `cpudex-core`; this crate wires it to the network and the filesystem.

pub mod api;
pub mod cli;
pub mod config;

// Re-export cpudex_core for convenience
pub use cpudex_core;
