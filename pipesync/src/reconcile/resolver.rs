//! Name-to-identifier resolution.

use std::sync::Arc;
use tracing::debug;

use crate::api::PipelineApi;
use crate::core::{Experiment, NotFoundError, Pipeline, Resolution, ResourceKind};
use crate::errors::Result;

/// Translates human-readable names into remote resources.
///
/// Each call performs exactly one remote lookup. The remote's "no such
/// resource" answer becomes [`Resolution::NotFound`]; every other remote
/// failure is returned as an error.
#[derive(Clone)]
pub struct ResourceNameResolver {
    api: Arc<dyn PipelineApi>,
}

impl ResourceNameResolver {
    /// Creates a resolver over the given API.
    #[must_use]
    pub fn new(api: Arc<dyn PipelineApi>) -> Self {
        Self { api }
    }

    /// Resolves an experiment by name within an optional namespace.
    pub async fn resolve_experiment(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Resolution<Experiment>> {
        match self.api.get_experiment(name, namespace).await {
            Ok(experiment) => {
                debug!(experiment = name, experiment_id = %experiment.experiment_id, "Resolved experiment");
                Ok(Resolution::Found(experiment))
            }
            Err(err) if err.is_not_found() => {
                debug!(experiment = name, namespace = ?namespace, "Experiment not found");
                let mut missing = NotFoundError::new(ResourceKind::Experiment, name);
                if let Some(ns) = namespace {
                    missing = missing.with_scope(ns);
                }
                Ok(Resolution::NotFound(missing))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Resolves a pipeline by name.
    pub async fn resolve_pipeline(&self, name: &str) -> Result<Resolution<Pipeline>> {
        match self.api.get_pipeline_id(name).await {
            Ok(Some(pipeline_id)) => {
                debug!(pipeline = name, pipeline_id = %pipeline_id, "Resolved pipeline");
                Ok(Resolution::Found(Pipeline::new(pipeline_id, name)))
            }
            Ok(None) => {
                debug!(pipeline = name, "Pipeline not found");
                Ok(Resolution::NotFound(NotFoundError::new(
                    ResourceKind::Pipeline,
                    name,
                )))
            }
            Err(err) if err.is_not_found() => Ok(Resolution::NotFound(NotFoundError::new(
                ResourceKind::Pipeline,
                name,
            ))),
            Err(err) => Err(err.into()),
        }
    }
}

impl std::fmt::Debug for ResourceNameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceNameResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ApiErrorKind};
    use crate::errors::ErrorKind;
    use crate::testing::{CallKind, InMemoryOrchestrator};

    #[tokio::test]
    async fn test_resolve_experiment_found() {
        let remote = Arc::new(InMemoryOrchestrator::new());
        remote.with_experiment("nightly", Some("kubeflow"));
        let resolver = ResourceNameResolver::new(remote.clone());

        let resolution = resolver
            .resolve_experiment("nightly", Some("kubeflow"))
            .await
            .unwrap();

        assert!(resolution.is_found());
        assert_eq!(remote.count(CallKind::GetExperiment), 1);
    }

    #[tokio::test]
    async fn test_resolve_experiment_absence_is_data() {
        let remote = Arc::new(InMemoryOrchestrator::new());
        remote.with_experiment("nightly", Some("other-ns"));
        let resolver = ResourceNameResolver::new(remote.clone());

        let resolution = resolver
            .resolve_experiment("nightly", Some("kubeflow"))
            .await
            .unwrap();

        match resolution {
            Resolution::NotFound(err) => {
                assert_eq!(err.kind, ResourceKind::Experiment);
                assert_eq!(err.scope.as_deref(), Some("kubeflow"));
            }
            Resolution::Found(_) => panic!("expected not found"),
        }
    }

    #[tokio::test]
    async fn test_resolve_pipeline() {
        let remote = Arc::new(InMemoryOrchestrator::new());
        let pipeline_id = remote.with_pipeline("Unet");
        let resolver = ResourceNameResolver::new(remote.clone());

        let found = resolver.resolve_pipeline("Unet").await.unwrap().found().unwrap();
        assert_eq!(found.pipeline_id, pipeline_id);
        assert_eq!(found.name, "Unet");

        assert!(resolver.resolve_pipeline("unet").await.unwrap().is_not_found());
        assert_eq!(remote.count(CallKind::GetPipelineId), 2);
    }

    #[tokio::test]
    async fn test_resolve_propagates_other_failures() {
        let remote = Arc::new(InMemoryOrchestrator::new());
        remote.fail_next(CallKind::GetPipelineId, ApiError::from_status(401, "no token"));
        let resolver = ResourceNameResolver::new(remote);

        let err = resolver.resolve_pipeline("Unet").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(matches!(
            err,
            crate::errors::ReconcileError::Api(ApiError { kind: ApiErrorKind::Unauthorized, .. })
        ));
    }
}
