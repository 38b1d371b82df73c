//! Testing utilities for code that drives a [`PipelineApi`](crate::api::PipelineApi).
//!
//! This module provides:
//! - An in-memory orchestrator that behaves like the remote server
//! - A record of every remote call made against it
//! - Scriptable failures per operation

mod mocks;

pub use mocks::{at_seconds, CallKind, InMemoryOrchestrator, RecordedCall};
