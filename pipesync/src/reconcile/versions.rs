//! Ordered lookup of pipeline versions by display name.
//!
//! Display names are not unique on the remote side. When several versions
//! share a name, the most recently created one is "the" version of that
//! name; ties on `created_at` go to whichever the server listed first.

use std::sync::Arc;
use tracing::debug;

use super::resolver::ResourceNameResolver;
use crate::api::{PipelineApi, VersionSort};
use crate::core::{NotFoundError, PipelineId, PipelineVersion, Resolution, ResourceKind};
use crate::errors::Result;

/// Picks the newest version whose display name equals `display_name`.
///
/// Matching is exact and case-sensitive. The input order is assumed to be
/// newest first, but the result does not depend on it except for ties.
#[must_use]
pub fn select_latest_version<'a>(
    versions: &'a [PipelineVersion],
    display_name: &str,
) -> Option<&'a PipelineVersion> {
    versions
        .iter()
        .filter(|v| v.display_name == display_name)
        .fold(None, |best: Option<&PipelineVersion>, candidate| match best {
            Some(current) if candidate.created_at <= current.created_at => Some(current),
            _ => Some(candidate),
        })
}

/// Finds pipeline versions by display name.
#[derive(Clone)]
pub struct VersionOrderingResolver {
    api: Arc<dyn PipelineApi>,
    resolver: ResourceNameResolver,
}

impl VersionOrderingResolver {
    /// Creates a version resolver over the given API.
    #[must_use]
    pub fn new(api: Arc<dyn PipelineApi>) -> Self {
        Self {
            resolver: ResourceNameResolver::new(api.clone()),
            api,
        }
    }

    /// Finds the newest version of `pipeline_id` named `display_name`.
    ///
    /// A missing pipeline and a missing version are both reported as
    /// [`Resolution::NotFound`], with different [`ResourceKind`]s.
    pub async fn find_version(
        &self,
        pipeline_id: &PipelineId,
        display_name: &str,
    ) -> Result<Resolution<PipelineVersion>> {
        let versions = match self
            .api
            .list_pipeline_versions(pipeline_id, VersionSort::CreatedAtDesc)
            .await
        {
            Ok(versions) => versions,
            Err(err) if err.is_not_found() => {
                debug!(pipeline_id = %pipeline_id, version = display_name, "Pipeline not found while listing versions");
                return Ok(Resolution::NotFound(
                    NotFoundError::new(ResourceKind::Pipeline, pipeline_id.as_str())
                        .while_looking_up(display_name),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        match select_latest_version(&versions, display_name) {
            Some(version) => {
                debug!(
                    pipeline_id = %pipeline_id,
                    version = display_name,
                    version_id = %version.pipeline_version_id,
                    candidates = versions.len(),
                    "Pipeline version found"
                );
                Ok(Resolution::Found(version.clone()))
            }
            None => Ok(Resolution::NotFound(
                NotFoundError::new(ResourceKind::PipelineVersion, display_name)
                    .with_scope(pipeline_id.as_str()),
            )),
        }
    }

    /// Resolves `pipeline_name` first, then finds the version within it.
    pub async fn find_version_by_pipeline_name(
        &self,
        pipeline_name: &str,
        display_name: &str,
    ) -> Result<Resolution<PipelineVersion>> {
        match self.resolver.resolve_pipeline(pipeline_name).await? {
            Resolution::Found(pipeline) => {
                let resolution = self.find_version(&pipeline.pipeline_id, display_name).await?;
                Ok(match resolution {
                    Resolution::NotFound(err) if err.kind == ResourceKind::PipelineVersion => {
                        Resolution::NotFound(err.with_scope(pipeline_name))
                    }
                    other => other,
                })
            }
            Resolution::NotFound(err) => Ok(Resolution::NotFound(err)),
        }
    }
}

impl std::fmt::Debug for VersionOrderingResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionOrderingResolver").finish_non_exhaustive()
    }
}
