//! REST implementation of [`PipelineApi`] on top of `reqwest`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

use super::wire::{
    display_name_filter, CreateExperimentBody, ErrorBody, ExperimentBody, ListExperimentsBody,
    ListPipelineVersionsBody, ListPipelinesBody, PipelineVersionBody,
};
use super::{ApiError, PipelineApi, VersionSort};
use crate::config::{ClientConfig, ConfigError};
use crate::core::{
    Experiment, ExperimentId, Pipeline, PipelineId, PipelineVersion, PipelineVersionId,
};

/// Path prefix of the orchestration server's REST API.
pub const API_PREFIX: &str = "/apis/v2beta1";

/// Cookie name set by the authenticating gateway in front of the server.
const SESSION_COOKIE_NAME: &str = "authservice_session";

/// Lookups only need to tell "none", "one" and "more than one" apart.
const LOOKUP_PAGE_SIZE: u32 = 2;

/// HTTP client for the orchestration API.
#[derive(Debug, Clone)]
pub struct HttpPipelineApi {
    client: reqwest::Client,
    base_url: String,
    namespace: Option<String>,
    page_size: u32,
}

impl HttpPipelineApi {
    /// Builds a client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(default_headers(config)?)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: format!("{}{API_PREFIX}", config.base_url()),
            namespace: config.namespace.clone(),
            page_size: config.page_size,
        })
    }

    /// Returns the API base URL (host plus API prefix).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        check_status(request.send().await?).await?;
        Ok(())
    }

    fn with_namespace(&self, request: RequestBuilder, namespace: Option<&str>) -> RequestBuilder {
        match namespace.or(self.namespace.as_deref()) {
            Some(ns) => request.query(&[("namespace", ns)]),
            None => request,
        }
    }

    async fn find_pipeline(&self, name: &str) -> Result<Option<Pipeline>, ApiError> {
        let request = self.client.get(self.url("/pipelines")).query(&[
            ("filter", display_name_filter(name)),
            ("page_size", LOOKUP_PAGE_SIZE.to_string()),
        ]);
        let body: ListPipelinesBody = self
            .send_json(self.with_namespace(request, None))
            .await?;

        let mut pipelines = body.pipelines.into_iter();
        match (pipelines.next(), pipelines.next()) {
            (None, _) => Ok(None),
            (Some(pipeline), None) => Ok(Some(pipeline.into())),
            (Some(_), Some(_)) => Err(ApiError::invalid_response(format!(
                "multiple pipelines named '{name}'"
            ))),
        }
    }
}

fn default_headers(config: &ClientConfig) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();

    if let Some(token) = config.resolve_token() {
        let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            ConfigError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                reason: e.to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, value);
    }

    if let Some(cookie) = config.resolve_session_cookie() {
        let value = HeaderValue::from_str(&format!("{SESSION_COOKIE_NAME}={cookie}")).map_err(
            |e| ConfigError::InvalidHeader {
                name: COOKIE.to_string(),
                reason: e.to_string(),
            },
        )?;
        headers.insert(COOKIE, value);
    }

    for (name, value) in config.resolved_headers() {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(&value).map_err(|e| ConfigError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });

    Err(ApiError::from_status(status.as_u16(), message))
}

#[async_trait]
impl PipelineApi for HttpPipelineApi {
    async fn get_experiment(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Experiment, ApiError> {
        let request = self.client.get(self.url("/experiments")).query(&[
            ("filter", display_name_filter(name)),
            ("page_size", LOOKUP_PAGE_SIZE.to_string()),
        ]);
        let body: ListExperimentsBody = self
            .send_json(self.with_namespace(request, namespace))
            .await?;

        let mut experiments = body.experiments.into_iter();
        match (experiments.next(), experiments.next()) {
            (None, _) => Err(ApiError::not_found(format!(
                "no experiment named '{name}'"
            ))),
            (Some(experiment), None) => Ok(experiment.into()),
            (Some(_), Some(_)) => Err(ApiError::invalid_response(format!(
                "multiple experiments named '{name}'"
            ))),
        }
    }

    async fn create_experiment(
        &self,
        name: &str,
        description: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<Experiment, ApiError> {
        let body = CreateExperimentBody {
            display_name: name,
            description,
            namespace: namespace.or(self.namespace.as_deref()),
        };
        let created: ExperimentBody = self
            .send_json(self.client.post(self.url("/experiments")).json(&body))
            .await?;
        Ok(created.into())
    }

    async fn delete_experiment(&self, experiment_id: &ExperimentId) -> Result<(), ApiError> {
        self.send_empty(
            self.client
                .delete(self.url(&format!("/experiments/{experiment_id}"))),
        )
        .await
    }

    async fn get_pipeline_id(&self, name: &str) -> Result<Option<PipelineId>, ApiError> {
        Ok(self.find_pipeline(name).await?.map(|p| p.pipeline_id))
    }

    async fn list_pipeline_versions(
        &self,
        pipeline_id: &PipelineId,
        sort: VersionSort,
    ) -> Result<Vec<PipelineVersion>, ApiError> {
        let url = self.url(&format!("/pipelines/{pipeline_id}/versions"));
        let mut versions = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("sort_by", sort.as_query().to_string()),
                ("page_size", self.page_size.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let body: ListPipelineVersionsBody =
                self.send_json(self.client.get(&url).query(&query)).await?;
            versions.extend(body.pipeline_versions.into_iter().map(PipelineVersion::from));

            match body.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) if page_token.as_deref() != Some(next.as_str()) => {
                    page_token = Some(next);
                }
                _ => break,
            }
        }

        debug!(pipeline_id = %pipeline_id, count = versions.len(), "Listed pipeline versions");
        Ok(versions)
    }

    async fn upload_pipeline_version(
        &self,
        package_path: &Path,
        version_name: &str,
        pipeline_name: &str,
        description: Option<&str>,
    ) -> Result<PipelineVersion, ApiError> {
        let package = tokio::fs::read(package_path).await.map_err(|e| {
            ApiError::bad_request(format!(
                "cannot read pipeline package {}: {e}",
                package_path.display()
            ))
        })?;

        let pipeline_id = self
            .get_pipeline_id(pipeline_name)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("no pipeline named '{pipeline_name}'")))?;

        let file_name = package_path
            .file_name()
            .map_or_else(|| "pipeline.yaml".to_string(), |n| n.to_string_lossy().into_owned());
        let form = Form::new().part("uploadfile", Part::bytes(package).file_name(file_name));

        let mut query = vec![
            ("name", version_name.to_string()),
            ("display_name", version_name.to_string()),
            ("pipelineid", pipeline_id.to_string()),
        ];
        if let Some(description) = description {
            query.push(("description", description.to_string()));
        }

        let created: PipelineVersionBody = self
            .send_json(
                self.client
                    .post(self.url("/pipelines/upload_version"))
                    .query(&query)
                    .multipart(form),
            )
            .await?;
        Ok(created.into())
    }

    async fn delete_pipeline_version(
        &self,
        pipeline_id: &PipelineId,
        version_id: &PipelineVersionId,
    ) -> Result<(), ApiError> {
        self.send_empty(
            self.client
                .delete(self.url(&format!("/pipelines/{pipeline_id}/versions/{version_id}"))),
        )
        .await
    }

    async fn delete_pipeline(&self, pipeline_id: &PipelineId) -> Result<(), ApiError> {
        self.send_empty(self.client.delete(self.url(&format!("/pipelines/{pipeline_id}"))))
            .await
    }
}
