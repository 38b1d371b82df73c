//! Version upload with conflict recovery.
//!
//! Re-uploading a version name that already exists is rejected by the
//! remote with a conflict. The reconciler answers a conflict by deleting the
//! existing version of that name and uploading again, so repeated publishes
//! of the same version name converge on the newly uploaded package. Between
//! the delete and the re-upload the version does not exist, and the
//! recreated version gets a fresh identifier and creation time.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::outcome::UploadOutcome;
use super::resolver::ResourceNameResolver;
use super::versions::VersionOrderingResolver;
use crate::api::PipelineApi;
use crate::config::UploadPolicy;
use crate::core::{PipelineVersionId, Resolution};
use crate::errors::{ErrorKind, ReconcileError, Result};
use crate::events::{event_types, EventSink};

/// Upper bound on conflict retries regardless of the requested budget.
pub const MAX_RETRY_BUDGET: u32 = 16;

/// Counter of delete-and-retry cycles left for one upload.
///
/// A budget of `n` allows `n` retries after the first attempt, so at most
/// `n + 1` uploads. A budget of 0 fails on the first conflict without
/// deleting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBudget {
    initial: u32,
    remaining: u32,
}

impl RetryBudget {
    /// Creates a budget, clamped to [`MAX_RETRY_BUDGET`].
    #[must_use]
    pub fn new(retries: u32) -> Self {
        let retries = retries.min(MAX_RETRY_BUDGET);
        Self {
            initial: retries,
            remaining: retries,
        }
    }

    /// Retries left.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Retries already spent.
    #[must_use]
    pub fn used(&self) -> u32 {
        self.initial - self.remaining
    }

    /// Maximum number of upload attempts this budget permits.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.initial + 1
    }

    /// Returns true if no retries are left.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Spends one retry. Returns false, without spending, if exhausted.
    pub fn try_consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(UploadPolicy::default().retry_budget)
    }
}

/// Uploads pipeline versions, replacing a same-named version on conflict.
#[derive(Clone)]
pub struct VersionUploadReconciler {
    api: Arc<dyn PipelineApi>,
    resolver: ResourceNameResolver,
    versions: VersionOrderingResolver,
    sink: Arc<dyn EventSink>,
    policy: UploadPolicy,
}

impl VersionUploadReconciler {
    /// Creates an upload reconciler with the default policy.
    #[must_use]
    pub fn new(api: Arc<dyn PipelineApi>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            resolver: ResourceNameResolver::new(api.clone()),
            versions: VersionOrderingResolver::new(api.clone()),
            api,
            sink,
            policy: UploadPolicy::default(),
        }
    }

    /// Sets the upload policy.
    #[must_use]
    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the upload policy.
    #[must_use]
    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Uploads `package_path` as version `version_name` of `pipeline_name`
    /// using the policy's retry budget.
    pub async fn upload(
        &self,
        package_path: &Path,
        version_name: &str,
        pipeline_name: &str,
        description: Option<&str>,
    ) -> Result<UploadOutcome> {
        self.upload_with_budget(
            package_path,
            version_name,
            pipeline_name,
            description,
            RetryBudget::new(self.policy.retry_budget),
        )
        .await
    }

    /// Uploads with an explicit retry budget.
    pub async fn upload_with_budget(
        &self,
        package_path: &Path,
        version_name: &str,
        pipeline_name: &str,
        description: Option<&str>,
        budget: RetryBudget,
    ) -> Result<UploadOutcome> {
        let operation_id = Uuid::new_v4().to_string();

        let result = self
            .run(
                &operation_id,
                package_path,
                version_name,
                pipeline_name,
                description,
                budget,
            )
            .await;

        if let Err(err) = &result {
            error!(
                operation_id = %operation_id,
                pipeline = pipeline_name,
                version = version_name,
                error = %err,
                "Failed to upload pipeline version"
            );
            let event_type = if err.kind() == ErrorKind::RetriesExhausted {
                event_types::VERSION_RETRIES_EXHAUSTED
            } else {
                event_types::VERSION_UPLOAD_FAILED
            };
            self.sink.emit(
                event_type,
                Some(serde_json::json!({
                    "operation_id": operation_id,
                    "pipeline": pipeline_name,
                    "version": version_name,
                    "error": err.to_json(),
                })),
            );
        }

        result
    }

    async fn run(
        &self,
        operation_id: &str,
        package_path: &Path,
        version_name: &str,
        pipeline_name: &str,
        description: Option<&str>,
        mut budget: RetryBudget,
    ) -> Result<UploadOutcome> {
        if version_name.is_empty() {
            return Err(ReconcileError::invalid_input("version name is empty"));
        }
        if pipeline_name.is_empty() {
            return Err(ReconcileError::invalid_input("pipeline name is empty"));
        }

        let mut replaced: Vec<PipelineVersionId> = Vec::new();

        for attempt in 1..=budget.max_attempts() {
            let pipeline = self.resolver.resolve_pipeline(pipeline_name).await?.into_result()?;
            info!(
                operation_id,
                pipeline = pipeline_name,
                pipeline_id = %pipeline.pipeline_id,
                attempt,
                "Pipeline found"
            );

            let conflict = match self
                .api
                .upload_pipeline_version(package_path, version_name, pipeline_name, description)
                .await
            {
                Ok(version) => {
                    info!(
                        operation_id,
                        pipeline = pipeline_name,
                        version = version_name,
                        version_id = %version.pipeline_version_id,
                        attempt,
                        retries_used = budget.used(),
                        "Pipeline version uploaded"
                    );
                    self.sink.emit(
                        event_types::VERSION_UPLOADED,
                        Some(serde_json::json!({
                            "operation_id": operation_id,
                            "pipeline": pipeline_name,
                            "version": version_name,
                            "version_id": version.pipeline_version_id,
                            "attempt": attempt,
                            "retries_used": budget.used(),
                        })),
                    );
                    return Ok(UploadOutcome {
                        version,
                        attempts: attempt,
                        replaced,
                    });
                }
                Err(err) if err.is_conflict() => err,
                Err(err) => return Err(err.into()),
            };

            warn!(
                operation_id,
                pipeline = pipeline_name,
                version = version_name,
                error = %conflict,
                retries_left = budget.remaining(),
                "Pipeline version already exists"
            );
            self.sink.emit(
                event_types::VERSION_CONFLICT,
                Some(serde_json::json!({
                    "operation_id": operation_id,
                    "pipeline": pipeline_name,
                    "version": version_name,
                    "attempt": attempt,
                    "retries_left": budget.remaining(),
                })),
            );

            if !budget.try_consume() {
                return Err(ReconcileError::retries_exhausted(
                    pipeline_name,
                    version_name,
                    attempt,
                ));
            }

            let existing = match self
                .versions
                .find_version(&pipeline.pipeline_id, version_name)
                .await?
            {
                Resolution::Found(version) => version,
                Resolution::NotFound(missing) => {
                    return Err(ReconcileError::conflict(
                        pipeline_name,
                        version_name,
                        format!("remote reported a conflict but {missing}"),
                    ));
                }
            };
            self.sink.emit(
                event_types::VERSION_FOUND,
                Some(serde_json::json!({
                    "operation_id": operation_id,
                    "pipeline": pipeline_name,
                    "version": version_name,
                    "version_id": existing.pipeline_version_id,
                })),
            );

            self.api
                .delete_pipeline_version(&pipeline.pipeline_id, &existing.pipeline_version_id)
                .await?;
            info!(
                operation_id,
                pipeline = pipeline_name,
                version = version_name,
                version_id = %existing.pipeline_version_id,
                "Pipeline version deleted, retrying upload"
            );
            self.sink.emit(
                event_types::VERSION_DELETED,
                Some(serde_json::json!({
                    "operation_id": operation_id,
                    "pipeline": pipeline_name,
                    "version": version_name,
                    "version_id": existing.pipeline_version_id,
                })),
            );
            replaced.push(existing.pipeline_version_id);

            if !self.policy.retry_delay().is_zero() {
                tokio::time::sleep(self.policy.retry_delay()).await;
            }
        }

        Err(ReconcileError::retries_exhausted(
            pipeline_name,
            version_name,
            budget.max_attempts(),
        ))
    }
}

impl std::fmt::Debug for VersionUploadReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionUploadReconciler")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::events::CollectingEventSink;
    use crate::testing::{at_seconds, CallKind, InMemoryOrchestrator};
    use pretty_assertions::assert_eq;

    const PACKAGE: &str = "pipeline.yaml";

    fn setup() -> (
        Arc<InMemoryOrchestrator>,
        Arc<CollectingEventSink>,
        VersionUploadReconciler,
    ) {
        let remote = Arc::new(InMemoryOrchestrator::new());
        let sink = Arc::new(CollectingEventSink::new());
        let reconciler = VersionUploadReconciler::new(remote.clone(), sink.clone());
        (remote, sink, reconciler)
    }

    #[test]
    fn test_retry_budget_consume() {
        let mut budget = RetryBudget::new(2);
        assert_eq!(budget.max_attempts(), 3);
        assert!(budget.try_consume());
        assert!(budget.try_consume());
        assert!(budget.is_exhausted());
        assert!(!budget.try_consume());
        assert_eq!(budget.used(), 2);
    }

    #[test]
    fn test_retry_budget_zero_and_clamp() {
        let budget = RetryBudget::new(0);
        assert!(budget.is_exhausted());
        assert_eq!(budget.max_attempts(), 1);

        assert_eq!(RetryBudget::new(u32::MAX).remaining(), MAX_RETRY_BUDGET);
        assert_eq!(RetryBudget::default().remaining(), 1);
    }

    #[tokio::test]
    async fn test_upload_fresh_version() {
        let (remote, sink, reconciler) = setup();
        remote.with_pipeline("Unet");

        let outcome = reconciler
            .upload(Path::new(PACKAGE), "v1", "Unet", Some("first cut"))
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.replaced_existing());
        assert_eq!(outcome.version.display_name, "v1");
        assert_eq!(outcome.version.description.as_deref(), Some("first cut"));
        assert_eq!(sink.event_types(), vec![event_types::VERSION_UPLOADED]);
    }

    #[tokio::test]
    async fn test_upload_replaces_existing_version() {
        let (remote, sink, reconciler) = setup();
        remote.with_pipeline("Unet");
        let stale = remote.with_version("Unet", "v1", at_seconds(10));

        let outcome = reconciler
            .upload(Path::new(PACKAGE), "v1", "Unet", None)
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.replaced, vec![stale.clone()]);
        assert_ne!(outcome.version.pipeline_version_id, stale);
        assert_eq!(remote.versions_of("Unet").len(), 1);
        assert_eq!(
            sink.event_types(),
            vec![
                event_types::VERSION_CONFLICT,
                event_types::VERSION_FOUND,
                event_types::VERSION_DELETED,
                event_types::VERSION_UPLOADED,
            ]
        );
    }

    #[tokio::test]
    async fn test_events_share_operation_id() {
        let (remote, sink, reconciler) = setup();
        remote.with_pipeline("Unet");
        remote.with_version("Unet", "v1", at_seconds(10));

        reconciler
            .upload(Path::new(PACKAGE), "v1", "Unet", None)
            .await
            .unwrap();

        let ids: Vec<serde_json::Value> = sink
            .events()
            .into_iter()
            .filter_map(|event| event.data.map(|d| d["operation_id"].clone()))
            .collect();
        assert_eq!(ids.len(), 4);
        assert!(ids.iter().all(|id| *id == ids[0]));
    }

    #[tokio::test]
    async fn test_budget_zero_fails_without_delete() {
        let (remote, sink, reconciler) = setup();
        remote.with_pipeline("Unet");
        remote.with_version("Unet", "v1", at_seconds(10));

        let err = reconciler
            .upload_with_budget(Path::new(PACKAGE), "v1", "Unet", None, RetryBudget::new(0))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RetriesExhausted);
        assert_eq!(remote.count(CallKind::DeletePipelineVersion), 0);
        assert_eq!(remote.count(CallKind::UploadPipelineVersion), 1);
        assert_eq!(sink.count(event_types::VERSION_RETRIES_EXHAUSTED), 1);
    }

    #[tokio::test]
    async fn test_persistent_conflict_exhausts_budget() {
        let (remote, _sink, reconciler) = setup();
        remote.with_pipeline("Unet");
        remote.with_version("Unet", "v1", at_seconds(1));
        remote.with_version("Unet", "v1", at_seconds(2));
        remote.with_version("Unet", "v1", at_seconds(3));
        remote.set_always_conflict(true);

        let err = reconciler
            .upload_with_budget(Path::new(PACKAGE), "v1", "Unet", None, RetryBudget::new(2))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(remote.count(CallKind::UploadPipelineVersion), 3);
        assert_eq!(remote.count(CallKind::DeletePipelineVersion), 2);
    }

    #[tokio::test]
    async fn test_missing_pipeline_short_circuits() {
        let (remote, sink, reconciler) = setup();

        let err = reconciler
            .upload(Path::new(PACKAGE), "v1", "Ghost", None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(remote.count(CallKind::UploadPipelineVersion), 0);
        assert_eq!(remote.count(CallKind::DeletePipelineVersion), 0);
        assert_eq!(sink.event_types(), vec![event_types::VERSION_UPLOAD_FAILED]);
    }

    #[tokio::test]
    async fn test_non_conflict_failure_is_not_retried() {
        let (remote, _sink, reconciler) = setup();
        remote.with_pipeline("Unet");
        remote.fail_next(
            CallKind::UploadPipelineVersion,
            ApiError::from_status(400, "invalid pipeline definition"),
        );

        let err = reconciler
            .upload(Path::new(PACKAGE), "v1", "Unet", None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(remote.count(CallKind::UploadPipelineVersion), 1);
        assert_eq!(remote.count(CallKind::ListPipelineVersions), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let (remote, _sink, reconciler) = setup();
        remote.with_pipeline("Unet");
        remote.fail_next(CallKind::UploadPipelineVersion, ApiError::timeout("deadline"));

        let err = reconciler
            .upload(Path::new(PACKAGE), "v1", "Unet", None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(remote.count(CallKind::DeletePipelineVersion), 0);
    }

    #[tokio::test]
    async fn test_conflict_without_matching_version() {
        let (remote, _sink, reconciler) = setup();
        remote.with_pipeline("Unet");
        remote.fail_next(CallKind::UploadPipelineVersion, ApiError::conflict("exists"));

        let err = reconciler
            .upload(Path::new(PACKAGE), "v1", "Unet", None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(remote.count(CallKind::DeletePipelineVersion), 0);
    }

    #[tokio::test]
    async fn test_delete_failure_propagates() {
        let (remote, _sink, reconciler) = setup();
        remote.with_pipeline("Unet");
        remote.with_version("Unet", "v1", at_seconds(1));
        remote.fail_next(
            CallKind::DeletePipelineVersion,
            ApiError::from_status(403, "forbidden"),
        );

        let err = reconciler
            .upload(Path::new(PACKAGE), "v1", "Unet", None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(remote.count(CallKind::UploadPipelineVersion), 1);
    }

    #[tokio::test]
    async fn test_retry_delay_applies() {
        let (remote, _sink, reconciler) = setup();
        let reconciler =
            reconciler.with_policy(UploadPolicy::default().with_retry_delay_ms(20));
        remote.with_pipeline("Unet");
        remote.with_version("Unet", "v1", at_seconds(1));

        let start = std::time::Instant::now();
        reconciler
            .upload(Path::new(PACKAGE), "v1", "Unet", None)
            .await
            .unwrap();

        assert!(start.elapsed() >= std::time::Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_empty_version_name_rejected() {
        let (remote, _sink, reconciler) = setup();

        let err = reconciler
            .upload(Path::new(PACKAGE), "", "Unet", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::InvalidInput(_)));
        assert!(remote.calls().is_empty());
    }
}
