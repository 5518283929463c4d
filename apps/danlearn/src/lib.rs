//! # danlearn
//!
//! Application layer for Danlearn: HTTP API, CLI, configuration and the
//! answer evaluator. All learner rules live in `danlearn-core`; this crate
//! wires them to a store, a clock and an evaluator, and serializes
//! load/mutate/save cycles per user id.

pub mod accounting;
pub mod api;
pub mod cli;
pub mod config;
pub mod evaluator;
pub mod locks;
pub mod orchestrator;
