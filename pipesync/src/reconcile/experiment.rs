//! Idempotent experiment reconciliation.

use std::sync::Arc;
use tracing::info;

use super::outcome::{EnsureOutcome, RemoveOutcome};
use super::resolver::ResourceNameResolver;
use crate::api::PipelineApi;
use crate::core::{Experiment, Resolution};
use crate::errors::{ReconcileError, Result};
use crate::events::{event_types, EventSink};

/// Create-or-noop and delete-or-noop over experiments keyed by name and
/// namespace.
///
/// An existing experiment is never modified: `ensure` does not update the
/// description of an experiment that is already there.
#[derive(Clone)]
pub struct ExperimentReconciler {
    api: Arc<dyn PipelineApi>,
    resolver: ResourceNameResolver,
    sink: Arc<dyn EventSink>,
}

impl ExperimentReconciler {
    /// Creates an experiment reconciler.
    #[must_use]
    pub fn new(api: Arc<dyn PipelineApi>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            resolver: ResourceNameResolver::new(api.clone()),
            api,
            sink,
        }
    }

    /// Makes sure an experiment named `name` exists.
    ///
    /// Performs at most one create call.
    pub async fn ensure(
        &self,
        name: &str,
        description: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<EnsureOutcome> {
        if name.is_empty() {
            return Err(ReconcileError::invalid_input("experiment name is empty"));
        }

        match self.resolver.resolve_experiment(name, namespace).await? {
            Resolution::Found(experiment) => {
                info!(
                    experiment = name,
                    experiment_id = %experiment.experiment_id,
                    "Experiment already exists"
                );
                self.emit(event_types::EXPERIMENT_EXISTS, &experiment);
                Ok(EnsureOutcome::AlreadyExists(experiment))
            }
            Resolution::NotFound(missing) => {
                info!(experiment = name, "{missing}");
                let experiment = self
                    .api
                    .create_experiment(name, description, namespace)
                    .await?;
                info!(
                    experiment = name,
                    experiment_id = %experiment.experiment_id,
                    "Experiment created"
                );
                self.emit(event_types::EXPERIMENT_CREATED, &experiment);
                Ok(EnsureOutcome::Created(experiment))
            }
        }
    }

    /// Deletes the experiment named `name` if it exists.
    ///
    /// Absence is reported as [`RemoveOutcome::NotFound`], not as an error.
    pub async fn remove(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<RemoveOutcome<Experiment>> {
        if name.is_empty() {
            return Err(ReconcileError::invalid_input("experiment name is empty"));
        }

        match self.resolver.resolve_experiment(name, namespace).await? {
            Resolution::Found(experiment) => {
                info!(experiment_id = %experiment.experiment_id, "Deleting experiment");
                self.api.delete_experiment(&experiment.experiment_id).await?;
                info!(experiment_id = %experiment.experiment_id, "Experiment deleted");
                self.emit(event_types::EXPERIMENT_DELETED, &experiment);
                Ok(RemoveOutcome::Deleted(experiment))
            }
            Resolution::NotFound(missing) => {
                info!(experiment = name, "{missing}, nothing to delete");
                self.sink.emit(
                    event_types::EXPERIMENT_NOT_FOUND,
                    Some(serde_json::json!({
                        "name": name,
                        "namespace": namespace,
                    })),
                );
                Ok(RemoveOutcome::NotFound(missing))
            }
        }
    }

    fn emit(&self, event_type: &str, experiment: &Experiment) {
        self.sink.emit(
            event_type,
            Some(serde_json::json!({
                "name": experiment.name,
                "namespace": experiment.namespace,
                "experiment_id": experiment.experiment_id,
            })),
        );
    }
}

impl std::fmt::Debug for ExperimentReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentReconciler").finish_non_exhaustive()
    }
}
