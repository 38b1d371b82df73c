//! References to resources living in the remote orchestration system.
//!
//! The client never persists these; they are snapshots of remote state taken
//! at the moment a name was resolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ExperimentId, PipelineId, PipelineVersionId};

/// An experiment, unique per `(name, namespace)` on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    /// Remote-assigned identifier.
    pub experiment_id: ExperimentId,
    /// Human-readable name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Namespace the experiment lives in, if the server is multi-user.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Creation time reported by the server.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Experiment {
    /// Creates an experiment reference with only the identity fields set.
    #[must_use]
    pub fn new(experiment_id: impl Into<ExperimentId>, name: impl Into<String>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            name: name.into(),
            description: None,
            namespace: None,
            created_at: None,
        }
    }

    /// Sets the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A pipeline, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Remote-assigned identifier.
    pub pipeline_id: PipelineId,
    /// Human-readable name.
    pub name: String,
}

impl Pipeline {
    /// Creates a pipeline reference.
    #[must_use]
    pub fn new(pipeline_id: impl Into<PipelineId>, name: impl Into<String>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            name: name.into(),
        }
    }
}

/// One uploaded version of a pipeline.
///
/// Display names are not unique on the remote side; `created_at` is what
/// orders duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineVersion {
    /// Remote-assigned identifier of this version.
    pub pipeline_version_id: PipelineVersionId,
    /// Owning pipeline.
    pub pipeline_id: PipelineId,
    /// Human-readable version name.
    pub display_name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Creation time reported by the server.
    pub created_at: DateTime<Utc>,
}

impl PipelineVersion {
    /// Creates a pipeline version reference.
    #[must_use]
    pub fn new(
        pipeline_version_id: impl Into<PipelineVersionId>,
        pipeline_id: impl Into<PipelineId>,
        display_name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            pipeline_version_id: pipeline_version_id.into(),
            pipeline_id: pipeline_id.into(),
            display_name: display_name.into(),
            description: None,
            created_at,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
