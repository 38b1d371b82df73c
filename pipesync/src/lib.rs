//! # Pipesync
//!
//! Idempotent reconciliation of named resources against a remote
//! pipeline-orchestration API.
//!
//! Pipesync drives three kinds of remote resources toward a desired state:
//!
//! - **Experiments**: get-or-create and delete-if-present, keyed by name and namespace
//! - **Pipelines**: delete-if-present, keyed by name
//! - **Pipeline versions**: upload with bounded conflict recovery, where an
//!   existing version of the same name is deleted and the upload retried
//!
//! Names are re-resolved against the remote system on every operation; no
//! identifiers are cached between calls.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipesync::prelude::*;
//!
//! let config = ClientConfig::new("http://localhost:8080").with_namespace("kubeflow");
//! let client = ReconcileClient::new(Arc::new(HttpPipelineApi::new(&config)?))
//!     .with_event_sink(Arc::new(LoggingEventSink::info()));
//!
//! client.experiments().ensure("nightly", None, Some("kubeflow")).await?;
//! client
//!     .uploads()
//!     .upload(Path::new("pipeline.yaml"), "v1", "Unet", None)
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod api;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod reconcile;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "http")]
    pub use crate::api::HttpPipelineApi;
    pub use crate::api::{ApiError, ApiErrorKind, PipelineApi, VersionSort};
    pub use crate::config::{ClientConfig, ConfigError, UploadPolicy};
    pub use crate::core::{
        Experiment, ExperimentId, NotFoundError, Pipeline, PipelineId, PipelineVersion,
        PipelineVersionId, Resolution, ResourceKind,
    };
    pub use crate::errors::{ErrorKind, ReconcileError, Result};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::reconcile::{
        EnsureOutcome, ExperimentReconciler, PipelineReconciler, ReconcileClient,
        RemoveOutcome, ResourceNameResolver, RetryBudget, UploadOutcome,
        VersionOrderingResolver, VersionUploadReconciler,
    };
}
