use super::core::AzureDevOpsClient;
use crate::error::Result;
use crate::providers::azure::types::{BuildRecord, ListResponse, TimelineRecord, TimelineResponse};

impl AzureDevOpsClient {
    /// `GET _apis/build/builds`, most recently queued first.
    pub async fn fetch_builds(&self) -> Result<Vec<BuildRecord>> {
        let url = self.api_url("build/builds", &[("queryOrder", "queueTimeDescending")])?;
        let response: ListResponse<BuildRecord> = self.get_json(url, "builds").await?;
        Ok(response.value)
    }

    /// `GET _apis/build/builds/{id}/timeline`
    pub async fn fetch_build_timeline(&self, build_id: i64) -> Result<Vec<TimelineRecord>> {
        let url = self.api_url(&format!("build/builds/{build_id}/timeline"), &[])?;
        let response: TimelineResponse = self.get_json(url, "build timeline").await?;
        Ok(response.records)
    }
}
