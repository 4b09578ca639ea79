//! `gw-gateway`: the Groundwork HTTP server.
//!
//! Route handlers, the AI record pipeline, startup wiring and the CLI.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod pipeline;
pub mod state;
