//! Facade bundling the remote API, an event sink and the upload policy.

use std::sync::Arc;

use super::experiment::ExperimentReconciler;
use super::pipeline::PipelineReconciler;
use super::upload::VersionUploadReconciler;
use super::versions::VersionOrderingResolver;
use crate::api::PipelineApi;
use crate::config::UploadPolicy;
use crate::events::{EventSink, NoOpEventSink};

/// Entry point handing out reconcilers that share one API handle and sink.
///
/// The client holds no remote state; every reconciler it returns resolves
/// names afresh on each call.
#[derive(Clone)]
pub struct ReconcileClient {
    api: Arc<dyn PipelineApi>,
    sink: Arc<dyn EventSink>,
    policy: UploadPolicy,
}

impl ReconcileClient {
    /// Creates a client over the given API with a no-op sink.
    #[must_use]
    pub fn new(api: Arc<dyn PipelineApi>) -> Self {
        Self {
            api,
            sink: Arc::new(NoOpEventSink),
            policy: UploadPolicy::default(),
        }
    }

    /// Creates an HTTP-backed client from configuration.
    #[cfg(feature = "http")]
    pub fn from_config(config: &crate::config::ClientConfig) -> crate::errors::Result<Self> {
        let api = crate::api::HttpPipelineApi::new(config)?;
        Ok(Self::new(Arc::new(api)).with_upload_policy(config.upload))
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the upload policy.
    #[must_use]
    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the upload policy.
    #[must_use]
    pub fn upload_policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Returns a version resolver.
    #[must_use]
    pub fn versions(&self) -> VersionOrderingResolver {
        VersionOrderingResolver::new(self.api.clone())
    }

    /// Returns an experiment reconciler.
    #[must_use]
    pub fn experiments(&self) -> ExperimentReconciler {
        ExperimentReconciler::new(self.api.clone(), self.sink.clone())
    }

    /// Returns a pipeline reconciler.
    #[must_use]
    pub fn pipelines(&self) -> PipelineReconciler {
        PipelineReconciler::new(self.api.clone(), self.sink.clone())
    }

    /// Returns a version upload reconciler using the client's policy.
    #[must_use]
    pub fn uploads(&self) -> VersionUploadReconciler {
        VersionUploadReconciler::new(self.api.clone(), self.sink.clone()).with_policy(self.policy)
    }
}

impl std::fmt::Debug for ReconcileClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::testing::InMemoryOrchestrator;
    use std::path::Path;

    #[tokio::test]
    async fn test_client_shares_sink_and_policy() {
        let remote = Arc::new(InMemoryOrchestrator::new());
        remote.with_pipeline("Unet");
        let sink = Arc::new(CollectingEventSink::new());
        let client = ReconcileClient::new(remote.clone())
            .with_event_sink(sink.clone())
            .with_upload_policy(UploadPolicy::default().with_retry_budget(4));

        assert_eq!(client.uploads().policy().retry_budget, 4);

        client.experiments().ensure("nightly", None, None).await.unwrap();
        client
            .uploads()
            .upload(Path::new("p.yaml"), "v1", "Unet", None)
            .await
            .unwrap();

        assert_eq!(sink.len(), 2);
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_from_config_applies_policy() {
        let config = crate::config::ClientConfig::new("http://localhost:8080")
            .with_upload_policy(UploadPolicy::default().with_retry_budget(3));
        let client = ReconcileClient::from_config(&config).unwrap();
        assert_eq!(client.upload_policy().retry_budget, 3);
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_from_config_rejects_invalid_host() {
        let err = ReconcileClient::from_config(&crate::config::ClientConfig::default()).unwrap_err();
        assert!(matches!(err, crate::errors::ReconcileError::Config(_)));
    }
}
