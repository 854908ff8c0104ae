use super::core::AzureDevOpsClient;
use crate::error::Result;
use crate::providers::azure::types::{ListResponse, PipelineRun, PipelineSummary};

impl AzureDevOpsClient {
    /// `GET _apis/pipelines`
    pub async fn fetch_pipelines(&self) -> Result<Vec<PipelineSummary>> {
        let url = self.api_url("pipelines", &[])?;
        let response: ListResponse<PipelineSummary> = self.get_json(url, "pipelines").await?;
        Ok(response.value)
    }

    /// `GET _apis/pipelines/{id}/runs`
    pub async fn fetch_pipeline_runs(&self, pipeline_id: i64) -> Result<Vec<PipelineRun>> {
        let url = self.api_url(&format!("pipelines/{pipeline_id}/runs"), &[])?;
        let response: ListResponse<PipelineRun> = self.get_json(url, "pipeline runs").await?;
        Ok(response.value)
    }
}
