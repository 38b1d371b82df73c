//! Idempotent pipeline and pipeline-version removal.

use std::sync::Arc;
use tracing::info;

use super::outcome::RemoveOutcome;
use super::resolver::ResourceNameResolver;
use super::versions::VersionOrderingResolver;
use crate::api::PipelineApi;
use crate::core::{Pipeline, PipelineVersion, Resolution, ResourceKind};
use crate::errors::{ReconcileError, Result};
use crate::events::{event_types, EventSink};

/// Delete-or-noop over pipelines and their versions.
///
/// Removing a pipeline issues a single delete for that pipeline; whatever
/// happens to its versions is up to the remote.
#[derive(Clone)]
pub struct PipelineReconciler {
    api: Arc<dyn PipelineApi>,
    resolver: ResourceNameResolver,
    versions: VersionOrderingResolver,
    sink: Arc<dyn EventSink>,
}

impl PipelineReconciler {
    /// Creates a pipeline reconciler.
    #[must_use]
    pub fn new(api: Arc<dyn PipelineApi>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            resolver: ResourceNameResolver::new(api.clone()),
            versions: VersionOrderingResolver::new(api.clone()),
            api,
            sink,
        }
    }

    /// Deletes the pipeline named `pipeline_name` if it exists.
    pub async fn remove(&self, pipeline_name: &str) -> Result<RemoveOutcome<Pipeline>> {
        if pipeline_name.is_empty() {
            return Err(ReconcileError::invalid_input("pipeline name is empty"));
        }

        match self.resolver.resolve_pipeline(pipeline_name).await? {
            Resolution::Found(pipeline) => {
                self.api.delete_pipeline(&pipeline.pipeline_id).await?;
                info!(pipeline = pipeline_name, pipeline_id = %pipeline.pipeline_id, "Pipeline deleted");
                self.sink.emit(
                    event_types::PIPELINE_DELETED,
                    Some(serde_json::json!({
                        "pipeline": pipeline_name,
                        "pipeline_id": pipeline.pipeline_id,
                    })),
                );
                Ok(RemoveOutcome::Deleted(pipeline))
            }
            Resolution::NotFound(missing) => {
                info!(pipeline = pipeline_name, "{missing}, nothing to delete");
                self.sink.emit(
                    event_types::PIPELINE_NOT_FOUND,
                    Some(serde_json::json!({ "pipeline": pipeline_name })),
                );
                Ok(RemoveOutcome::NotFound(missing))
            }
        }
    }

    /// Deletes the newest version named `version_name` of `pipeline_name`.
    ///
    /// A missing pipeline or version is a no-op.
    pub async fn remove_version(
        &self,
        pipeline_name: &str,
        version_name: &str,
    ) -> Result<RemoveOutcome<PipelineVersion>> {
        if pipeline_name.is_empty() || version_name.is_empty() {
            return Err(ReconcileError::invalid_input(
                "pipeline and version names must be non-empty",
            ));
        }

        match self
            .versions
            .find_version_by_pipeline_name(pipeline_name, version_name)
            .await?
        {
            Resolution::Found(version) => {
                self.api
                    .delete_pipeline_version(&version.pipeline_id, &version.pipeline_version_id)
                    .await?;
                info!(
                    pipeline = pipeline_name,
                    version = version_name,
                    version_id = %version.pipeline_version_id,
                    "Pipeline version deleted"
                );
                self.sink.emit(
                    event_types::VERSION_DELETED,
                    Some(serde_json::json!({
                        "pipeline": pipeline_name,
                        "version": version_name,
                        "version_id": version.pipeline_version_id,
                    })),
                );
                Ok(RemoveOutcome::Deleted(version))
            }
            Resolution::NotFound(missing) => {
                info!(pipeline = pipeline_name, version = version_name, "{missing}, nothing to delete");
                let event_type = if missing.kind == ResourceKind::Pipeline {
                    event_types::PIPELINE_NOT_FOUND
                } else {
                    event_types::VERSION_NOT_FOUND
                };
                self.sink.emit(
                    event_type,
                    Some(serde_json::json!({
                        "pipeline": pipeline_name,
                        "version": version_name,
                    })),
                );
                Ok(RemoveOutcome::NotFound(missing))
            }
        }
    }
}

impl std::fmt::Debug for PipelineReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineReconciler").finish_non_exhaustive()
    }
}
