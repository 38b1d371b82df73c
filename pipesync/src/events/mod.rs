//! Event sinks for reconciliation observability.
//!
//! Every reconciler receives an [`EventSink`] at construction time and
//! reports what it resolved, created, deleted or gave up on. Sinks are
//! injected rather than global so callers and tests can observe exactly the
//! events of the operations they drive.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// Event type names emitted by the reconcilers.
pub mod event_types {
    /// An experiment with the requested name already exists.
    pub const EXPERIMENT_EXISTS: &str = "experiment.exists";
    /// An experiment was created.
    pub const EXPERIMENT_CREATED: &str = "experiment.created";
    /// No experiment with the requested name exists.
    pub const EXPERIMENT_NOT_FOUND: &str = "experiment.not_found";
    /// An experiment was deleted.
    pub const EXPERIMENT_DELETED: &str = "experiment.deleted";

    /// No pipeline with the requested name exists.
    pub const PIPELINE_NOT_FOUND: &str = "pipeline.not_found";
    /// A pipeline was deleted.
    pub const PIPELINE_DELETED: &str = "pipeline.deleted";

    /// A version with the requested display name was located.
    pub const VERSION_FOUND: &str = "version.found";
    /// No version with the requested display name exists.
    pub const VERSION_NOT_FOUND: &str = "version.not_found";
    /// A version was uploaded.
    pub const VERSION_UPLOADED: &str = "version.uploaded";
    /// The remote rejected an upload because the version exists.
    pub const VERSION_CONFLICT: &str = "version.conflict";
    /// A version was deleted.
    pub const VERSION_DELETED: &str = "version.deleted";
    /// An upload failed without a retry.
    pub const VERSION_UPLOAD_FAILED: &str = "version.upload_failed";
    /// The conflict retry budget was used up.
    pub const VERSION_RETRIES_EXHAUSTED: &str = "version.retries_exhausted";
}
