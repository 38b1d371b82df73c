//! JSON bodies exchanged with the orchestration server's REST surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Experiment, Pipeline, PipelineVersion};

#[derive(Debug, Deserialize)]
pub(crate) struct ExperimentBody {
    pub experiment_id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<ExperimentBody> for Experiment {
    fn from(body: ExperimentBody) -> Self {
        Self {
            experiment_id: body.experiment_id.into(),
            name: body.display_name,
            description: body.description.filter(|d| !d.is_empty()),
            namespace: body.namespace.filter(|n| !n.is_empty()),
            created_at: body.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListExperimentsBody {
    #[serde(default)]
    pub experiments: Vec<ExperimentBody>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateExperimentBody<'a> {
    pub display_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PipelineBody {
    pub pipeline_id: String,
    pub display_name: String,
}

impl From<PipelineBody> for Pipeline {
    fn from(body: PipelineBody) -> Self {
        Self::new(body.pipeline_id, body.display_name)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListPipelinesBody {
    #[serde(default)]
    pub pipelines: Vec<PipelineBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PipelineVersionBody {
    pub pipeline_id: String,
    pub pipeline_version_id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PipelineVersionBody> for PipelineVersion {
    fn from(body: PipelineVersionBody) -> Self {
        Self {
            pipeline_version_id: body.pipeline_version_id.into(),
            pipeline_id: body.pipeline_id.into(),
            display_name: body.display_name,
            description: body.description.filter(|d| !d.is_empty()),
            created_at: body.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListPipelineVersionsBody {
    #[serde(default)]
    pub pipeline_versions: Vec<PipelineVersionBody>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Error body produced by the server's gateway.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .filter(|m| !m.is_empty())
            .or(self.error_message.filter(|m| !m.is_empty()))
    }
}

/// Builds a `display_name EQUALS name` filter expression.
pub(crate) fn display_name_filter(name: &str) -> String {
    serde_json::json!({
        "predicates": [{
            "key": "display_name",
            "operation": "EQUALS",
            "string_value": name,
        }]
    })
    .to_string()
}
