//! The remote orchestration API seam.
//!
//! [`PipelineApi`] is the complete set of remote operations the reconcilers
//! drive. [`HttpPipelineApi`] talks to a real server over REST; tests use
//! the in-memory orchestrator from [`crate::testing`].

mod error;
#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
mod wire;

pub use error::{ApiError, ApiErrorKind};
#[cfg(feature = "http")]
pub use http::HttpPipelineApi;

use async_trait::async_trait;
use std::path::Path;

use crate::core::{Experiment, ExperimentId, PipelineId, PipelineVersion, PipelineVersionId};

/// Ordering requested when listing pipeline versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VersionSort {
    /// Newest first.
    #[default]
    CreatedAtDesc,
    /// Oldest first.
    CreatedAtAsc,
}

impl VersionSort {
    /// Returns the server-side sort expression.
    #[must_use]
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::CreatedAtDesc => "created_at desc",
            Self::CreatedAtAsc => "created_at asc",
        }
    }
}

/// Remote operations over experiments, pipelines and pipeline versions.
///
/// Implementations perform exactly one logical remote operation per call and
/// never cache identifiers.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Looks up an experiment by name. Absence is `ApiErrorKind::NotFound`.
    async fn get_experiment(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Experiment, ApiError>;

    /// Creates an experiment.
    async fn create_experiment(
        &self,
        name: &str,
        description: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<Experiment, ApiError>;

    /// Deletes an experiment by identifier.
    async fn delete_experiment(&self, experiment_id: &ExperimentId) -> Result<(), ApiError>;

    /// Looks up a pipeline identifier by name. Absence is `Ok(None)`.
    async fn get_pipeline_id(&self, name: &str) -> Result<Option<PipelineId>, ApiError>;

    /// Lists every version of a pipeline in the requested order.
    async fn list_pipeline_versions(
        &self,
        pipeline_id: &PipelineId,
        sort: VersionSort,
    ) -> Result<Vec<PipelineVersion>, ApiError>;

    /// Uploads a packaged pipeline as a new version of `pipeline_name`.
    ///
    /// A version of the same name that already exists is reported as
    /// `ApiErrorKind::Conflict`.
    async fn upload_pipeline_version(
        &self,
        package_path: &Path,
        version_name: &str,
        pipeline_name: &str,
        description: Option<&str>,
    ) -> Result<PipelineVersion, ApiError>;

    /// Deletes one pipeline version.
    async fn delete_pipeline_version(
        &self,
        pipeline_id: &PipelineId,
        version_id: &PipelineVersionId,
    ) -> Result<(), ApiError>;

    /// Deletes a pipeline.
    async fn delete_pipeline(&self, pipeline_id: &PipelineId) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_sort_query() {
        assert_eq!(VersionSort::default(), VersionSort::CreatedAtDesc);
        assert_eq!(VersionSort::CreatedAtDesc.as_query(), "created_at desc");
        assert_eq!(VersionSort::CreatedAtAsc.as_query(), "created_at asc");
    }
}
