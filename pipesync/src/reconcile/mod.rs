//! Reconcilers driving remote resources toward a named desired state.
//!
//! - [`ResourceNameResolver`]: names to remote resources, absence as data
//! - [`VersionOrderingResolver`]: newest version by display name
//! - [`ExperimentReconciler`]: get-or-create and delete-if-present
//! - [`VersionUploadReconciler`]: upload with bounded conflict recovery
//! - [`PipelineReconciler`]: delete-if-present for pipelines and versions

mod client;
mod experiment;
mod outcome;
mod pipeline;
mod resolver;
mod upload;
mod versions;

pub use client::ReconcileClient;
pub use experiment::ExperimentReconciler;
pub use outcome::{EnsureOutcome, RemoveOutcome, UploadOutcome};
pub use pipeline::PipelineReconciler;
pub use resolver::ResourceNameResolver;
pub use upload::{RetryBudget, VersionUploadReconciler, MAX_RETRY_BUDGET};
pub use versions::{select_latest_version, VersionOrderingResolver};
