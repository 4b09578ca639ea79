//! `gw-domain`: types shared by every Groundwork crate.
//!
//! Configuration, the error type, chat message shapes, persisted records
//! and structured trace events.

pub mod chat;
pub mod config;
pub mod error;
pub mod records;
pub mod trace;
