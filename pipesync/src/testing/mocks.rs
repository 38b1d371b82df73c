//! In-memory stand-in for the remote orchestration server.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use crate::api::{ApiError, PipelineApi, VersionSort};
use crate::core::{
    Experiment, ExperimentId, Pipeline, PipelineId, PipelineVersion, PipelineVersionId,
};

/// Returns a fixed UTC instant `secs` seconds after a reference epoch.
#[must_use]
pub fn at_seconds(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .unwrap_or_default()
}

/// The remote operation a call targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `get_experiment`
    GetExperiment,
    /// `create_experiment`
    CreateExperiment,
    /// `delete_experiment`
    DeleteExperiment,
    /// `get_pipeline_id`
    GetPipelineId,
    /// `list_pipeline_versions`
    ListPipelineVersions,
    /// `upload_pipeline_version`
    UploadPipelineVersion,
    /// `delete_pipeline_version`
    DeletePipelineVersion,
    /// `delete_pipeline`
    DeletePipeline,
}

/// A remote call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// Experiment lookup.
    GetExperiment {
        /// Queried name.
        name: String,
        /// Queried namespace.
        namespace: Option<String>,
    },
    /// Experiment creation.
    CreateExperiment {
        /// Experiment name.
        name: String,
        /// Description.
        description: Option<String>,
        /// Namespace.
        namespace: Option<String>,
    },
    /// Experiment deletion.
    DeleteExperiment {
        /// Deleted experiment.
        experiment_id: ExperimentId,
    },
    /// Pipeline lookup.
    GetPipelineId {
        /// Queried name.
        name: String,
    },
    /// Version listing.
    ListPipelineVersions {
        /// Listed pipeline.
        pipeline_id: PipelineId,
    },
    /// Version upload.
    UploadPipelineVersion {
        /// Package file.
        package_path: PathBuf,
        /// Version name.
        version_name: String,
        /// Target pipeline name.
        pipeline_name: String,
        /// Description.
        description: Option<String>,
    },
    /// Version deletion.
    DeletePipelineVersion {
        /// Owning pipeline.
        pipeline_id: PipelineId,
        /// Deleted version.
        version_id: PipelineVersionId,
    },
    /// Pipeline deletion.
    DeletePipeline {
        /// Deleted pipeline.
        pipeline_id: PipelineId,
    },
}

impl RecordedCall {
    /// Returns which operation this call targeted.
    #[must_use]
    pub fn kind(&self) -> CallKind {
        match self {
            Self::GetExperiment { .. } => CallKind::GetExperiment,
            Self::CreateExperiment { .. } => CallKind::CreateExperiment,
            Self::DeleteExperiment { .. } => CallKind::DeleteExperiment,
            Self::GetPipelineId { .. } => CallKind::GetPipelineId,
            Self::ListPipelineVersions { .. } => CallKind::ListPipelineVersions,
            Self::UploadPipelineVersion { .. } => CallKind::UploadPipelineVersion,
            Self::DeletePipelineVersion { .. } => CallKind::DeletePipelineVersion,
            Self::DeletePipeline { .. } => CallKind::DeletePipeline,
        }
    }

    /// Returns true if the call changes remote state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        matches!(
            self.kind(),
            CallKind::CreateExperiment
                | CallKind::DeleteExperiment
                | CallKind::UploadPipelineVersion
                | CallKind::DeletePipelineVersion
                | CallKind::DeletePipeline
        )
    }

    /// Returns true if any argument of the call equals `value`.
    #[must_use]
    pub fn references(&self, value: &str) -> bool {
        match self {
            Self::GetExperiment { name, namespace } => {
                name == value || namespace.as_deref() == Some(value)
            }
            Self::CreateExperiment {
                name,
                description,
                namespace,
            } => {
                name == value
                    || description.as_deref() == Some(value)
                    || namespace.as_deref() == Some(value)
            }
            Self::DeleteExperiment { experiment_id } => experiment_id.as_str() == value,
            Self::GetPipelineId { name } => name == value,
            Self::ListPipelineVersions { pipeline_id } | Self::DeletePipeline { pipeline_id } => {
                pipeline_id.as_str() == value
            }
            Self::UploadPipelineVersion {
                version_name,
                pipeline_name,
                description,
                ..
            } => {
                version_name == value
                    || pipeline_name == value
                    || description.as_deref() == Some(value)
            }
            Self::DeletePipelineVersion {
                pipeline_id,
                version_id,
            } => pipeline_id.as_str() == value || version_id.as_str() == value,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    experiments: Vec<Experiment>,
    pipelines: Vec<Pipeline>,
    versions: Vec<PipelineVersion>,
    calls: Vec<RecordedCall>,
    failures: HashMap<CallKind, VecDeque<ApiError>>,
    always_conflict: bool,
    next_id: u64,
    clock: i64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        at_seconds(1_000_000 + self.clock)
    }

    fn take_failure(&mut self, kind: CallKind) -> Option<ApiError> {
        self.failures.get_mut(&kind).and_then(VecDeque::pop_front)
    }

    fn record(&mut self, call: RecordedCall) -> Result<(), ApiError> {
        let kind = call.kind();
        self.calls.push(call);
        self.take_failure(kind).map_or(Ok(()), Err)
    }

    fn pipeline_id(&self, name: &str) -> Option<PipelineId> {
        self.pipelines
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.pipeline_id.clone())
    }
}

/// An in-memory orchestrator recording every call made against it.
///
/// Uploads of a version name that already exists in the pipeline fail with a
/// conflict, like the real server. Failures can be queued per operation with
/// [`fail_next`](Self::fail_next).
#[derive(Debug, Default)]
pub struct InMemoryOrchestrator {
    state: Mutex<State>,
}

impl InMemoryOrchestrator {
    /// Creates an empty orchestrator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an experiment and returns its identifier.
    pub fn with_experiment(&self, name: &str, namespace: Option<&str>) -> ExperimentId {
        let mut state = self.state.lock();
        let id = ExperimentId::new(state.next_id("exp"));
        let mut experiment = Experiment::new(id.clone(), name);
        if let Some(namespace) = namespace {
            experiment = experiment.with_namespace(namespace);
        }
        state.experiments.push(experiment);
        id
    }

    /// Seeds a pipeline and returns its identifier.
    pub fn with_pipeline(&self, name: &str) -> PipelineId {
        let mut state = self.state.lock();
        let id = PipelineId::new(state.next_id("pipe"));
        state.pipelines.push(Pipeline::new(id.clone(), name));
        id
    }

    /// Seeds a version of an already seeded pipeline.
    ///
    /// # Panics
    ///
    /// Panics if the pipeline was not seeded.
    pub fn with_version(
        &self,
        pipeline_name: &str,
        display_name: &str,
        created_at: DateTime<Utc>,
    ) -> PipelineVersionId {
        let mut state = self.state.lock();
        let pipeline_id = state
            .pipeline_id(pipeline_name)
            .unwrap_or_else(|| panic!("pipeline '{pipeline_name}' not seeded"));
        let id = PipelineVersionId::new(state.next_id("ver"));
        state.versions.push(PipelineVersion::new(
            id.clone(),
            pipeline_id,
            display_name,
            created_at,
        ));
        id
    }

    /// Makes the next call of `kind` fail with `error`.
    ///
    /// The call is still recorded. Queued failures are consumed in order.
    pub fn fail_next(&self, kind: CallKind, error: ApiError) {
        self.state
            .lock()
            .failures
            .entry(kind)
            .or_default()
            .push_back(error);
    }

    /// Makes every upload fail with a conflict.
    pub fn set_always_conflict(&self, enabled: bool) {
        self.state.lock().always_conflict = enabled;
    }

    /// Returns all recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Returns recorded calls that change remote state.
    #[must_use]
    pub fn mutating_calls(&self) -> Vec<RecordedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.is_mutating())
            .cloned()
            .collect()
    }

    /// Returns the number of recorded calls of `kind`.
    #[must_use]
    pub fn count(&self, kind: CallKind) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.kind() == kind)
            .count()
    }

    /// Returns the live experiments.
    #[must_use]
    pub fn experiments(&self) -> Vec<Experiment> {
        self.state.lock().experiments.clone()
    }

    /// Returns the identifier of a live pipeline.
    #[must_use]
    pub fn pipeline_id(&self, name: &str) -> Option<PipelineId> {
        self.state.lock().pipeline_id(name)
    }

    /// Returns the live versions of a pipeline in insertion order.
    #[must_use]
    pub fn versions_of(&self, pipeline_name: &str) -> Vec<PipelineVersion> {
        let state = self.state.lock();
        let Some(pipeline_id) = state.pipeline_id(pipeline_name) else {
            return Vec::new();
        };
        state
            .versions
            .iter()
            .filter(|v| v.pipeline_id == pipeline_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PipelineApi for InMemoryOrchestrator {
    async fn get_experiment(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Experiment, ApiError> {
        let mut state = self.state.lock();
        state.record(RecordedCall::GetExperiment {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
        })?;
        state
            .experiments
            .iter()
            .find(|e| e.name == name && e.namespace.as_deref() == namespace)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("no experiment named '{name}'")))
    }

    async fn create_experiment(
        &self,
        name: &str,
        description: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<Experiment, ApiError> {
        let mut state = self.state.lock();
        state.record(RecordedCall::CreateExperiment {
            name: name.to_string(),
            description: description.map(str::to_string),
            namespace: namespace.map(str::to_string),
        })?;
        if state
            .experiments
            .iter()
            .any(|e| e.name == name && e.namespace.as_deref() == namespace)
        {
            return Err(ApiError::conflict(format!("experiment '{name}' already exists")));
        }

        let created_at = state.tick();
        let mut experiment = Experiment::new(state.next_id("exp"), name);
        experiment.created_at = Some(created_at);
        if let Some(description) = description {
            experiment = experiment.with_description(description);
        }
        if let Some(namespace) = namespace {
            experiment = experiment.with_namespace(namespace);
        }
        state.experiments.push(experiment.clone());
        Ok(experiment)
    }

    async fn delete_experiment(&self, experiment_id: &ExperimentId) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.record(RecordedCall::DeleteExperiment {
            experiment_id: experiment_id.clone(),
        })?;
        let before = state.experiments.len();
        state.experiments.retain(|e| &e.experiment_id != experiment_id);
        if state.experiments.len() == before {
            return Err(ApiError::not_found(format!("no experiment '{experiment_id}'")));
        }
        Ok(())
    }

    async fn get_pipeline_id(&self, name: &str) -> Result<Option<PipelineId>, ApiError> {
        let mut state = self.state.lock();
        state.record(RecordedCall::GetPipelineId {
            name: name.to_string(),
        })?;
        Ok(state.pipeline_id(name))
    }

    async fn list_pipeline_versions(
        &self,
        pipeline_id: &PipelineId,
        sort: VersionSort,
    ) -> Result<Vec<PipelineVersion>, ApiError> {
        let mut state = self.state.lock();
        state.record(RecordedCall::ListPipelineVersions {
            pipeline_id: pipeline_id.clone(),
        })?;
        if !state.pipelines.iter().any(|p| &p.pipeline_id == pipeline_id) {
            return Err(ApiError::not_found(format!("no pipeline '{pipeline_id}'")));
        }

        let mut versions: Vec<PipelineVersion> = state
            .versions
            .iter()
            .filter(|v| &v.pipeline_id == pipeline_id)
            .cloned()
            .collect();
        match sort {
            VersionSort::CreatedAtDesc => versions.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            VersionSort::CreatedAtAsc => versions.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }
        Ok(versions)
    }

    async fn upload_pipeline_version(
        &self,
        package_path: &Path,
        version_name: &str,
        pipeline_name: &str,
        description: Option<&str>,
    ) -> Result<PipelineVersion, ApiError> {
        let mut state = self.state.lock();
        state.record(RecordedCall::UploadPipelineVersion {
            package_path: package_path.to_path_buf(),
            version_name: version_name.to_string(),
            pipeline_name: pipeline_name.to_string(),
            description: description.map(str::to_string),
        })?;

        let pipeline_id = state
            .pipeline_id(pipeline_name)
            .ok_or_else(|| ApiError::not_found(format!("no pipeline named '{pipeline_name}'")))?;
        let exists = state
            .versions
            .iter()
            .any(|v| v.pipeline_id == pipeline_id && v.display_name == version_name);
        if state.always_conflict || exists {
            return Err(ApiError::conflict(format!(
                "pipeline version '{version_name}' already exists"
            ))
            .with_status(409));
        }

        let created_at = state.tick();
        let mut version = PipelineVersion::new(
            state.next_id("ver"),
            pipeline_id,
            version_name,
            created_at,
        );
        if let Some(description) = description {
            version = version.with_description(description);
        }
        state.versions.push(version.clone());
        Ok(version)
    }

    async fn delete_pipeline_version(
        &self,
        pipeline_id: &PipelineId,
        version_id: &PipelineVersionId,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.record(RecordedCall::DeletePipelineVersion {
            pipeline_id: pipeline_id.clone(),
            version_id: version_id.clone(),
        })?;
        let before = state.versions.len();
        state
            .versions
            .retain(|v| !(&v.pipeline_id == pipeline_id && &v.pipeline_version_id == version_id));
        if state.versions.len() == before {
            return Err(ApiError::not_found(format!("no pipeline version '{version_id}'")));
        }
        Ok(())
    }

    async fn delete_pipeline(&self, pipeline_id: &PipelineId) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.record(RecordedCall::DeletePipeline {
            pipeline_id: pipeline_id.clone(),
        })?;
        let before = state.pipelines.len();
        state.pipelines.retain(|p| &p.pipeline_id != pipeline_id);
        if state.pipelines.len() == before {
            return Err(ApiError::not_found(format!("no pipeline '{pipeline_id}'")));
        }
        state.versions.retain(|v| &v.pipeline_id != pipeline_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_at_seconds_is_ordered() {
        assert!(at_seconds(1) < at_seconds(2));
        assert_eq!(at_seconds(5) - at_seconds(2), Duration::seconds(3));
    }

    #[tokio::test]
    async fn test_upload_conflicts_on_existing_name() {
        let remote = InMemoryOrchestrator::new();
        remote.with_pipeline("P");
        remote.with_version("P", "v1", at_seconds(1));

        let err = remote
            .upload_pipeline_version(Path::new("p.yaml"), "v1", "P", None)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.status, Some(409));
    }

    #[tokio::test]
    async fn test_uploaded_versions_are_newer_than_seeded() {
        let remote = InMemoryOrchestrator::new();
        remote.with_pipeline("P");
        remote.with_version("P", "old", at_seconds(500));

        let uploaded = remote
            .upload_pipeline_version(Path::new("p.yaml"), "new", "P", None)
            .await
            .unwrap();
        let listed = remote
            .list_pipeline_versions(&remote.pipeline_id("P").unwrap(), VersionSort::CreatedAtDesc)
            .await
            .unwrap();

        assert_eq!(listed[0].pipeline_version_id, uploaded.pipeline_version_id);
    }

    #[tokio::test]
    async fn test_fail_next_is_consumed_once() {
        let remote = InMemoryOrchestrator::new();
        remote.fail_next(CallKind::GetPipelineId, ApiError::timeout("slow"));

        assert!(remote.get_pipeline_id("P").await.is_err());
        assert!(remote.get_pipeline_id("P").await.unwrap().is_none());
        assert_eq!(remote.count(CallKind::GetPipelineId), 2);
    }

    #[test]
    fn test_recorded_call_references() {
        let call = RecordedCall::GetPipelineId {
            name: "P".to_string(),
        };
        assert!(call.references("P"));
        assert!(!call.references("Q"));
        assert!(!call.is_mutating());

        let delete = RecordedCall::DeletePipeline {
            pipeline_id: PipelineId::new("pipe-1"),
        };
        assert!(delete.is_mutating());
        assert!(delete.references("pipe-1"));
    }

    #[tokio::test]
    async fn test_create_experiment_stores_description_and_namespace() {
        let remote = InMemoryOrchestrator::new();

        let created = remote
            .create_experiment("nightly", Some("runs"), Some("ml"))
            .await
            .unwrap();
        assert_eq!(created.description.as_deref(), Some("runs"));
        assert_eq!(created.namespace.as_deref(), Some("ml"));
        assert!(created.created_at.is_some());

        assert!(remote.get_experiment("nightly", None).await.unwrap_err().is_not_found());
        assert_eq!(remote.get_experiment("nightly", Some("ml")).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_delete_pipeline_cascades_remotely() {
        let remote = InMemoryOrchestrator::new();
        let id = remote.with_pipeline("P");
        remote.with_version("P", "v1", at_seconds(1));

        remote.delete_pipeline(&id).await.unwrap();
        assert!(remote.pipeline_id("P").is_none());
        assert!(remote.delete_pipeline(&id).await.unwrap_err().is_not_found());
    }
}
