mod builds;
mod core;
mod pipelines;

use std::future::Future;

pub use self::core::{AzureDevOpsClient, REQUEST_TIMEOUT};

use super::types::{BuildRecord, PipelineRun, PipelineSummary, TimelineRecord};
use crate::error::Result;

/// Remote calls a collection cycle depends on.
///
/// Implemented by [`AzureDevOpsClient`]; tests substitute in-memory fakes.
pub trait Gateway: Send + Sync {
    fn list_pipelines(&self) -> impl Future<Output = Result<Vec<PipelineSummary>>> + Send;

    fn list_pipeline_runs(
        &self,
        pipeline_id: i64,
    ) -> impl Future<Output = Result<Vec<PipelineRun>>> + Send;

    /// Builds ordered most-recent-first.
    fn list_builds(&self) -> impl Future<Output = Result<Vec<BuildRecord>>> + Send;

    fn get_build_timeline(
        &self,
        build_id: i64,
    ) -> impl Future<Output = Result<Vec<TimelineRecord>>> + Send;
}

impl Gateway for AzureDevOpsClient {
    async fn list_pipelines(&self) -> Result<Vec<PipelineSummary>> {
        self.fetch_pipelines().await
    }

    async fn list_pipeline_runs(&self, pipeline_id: i64) -> Result<Vec<PipelineRun>> {
        self.fetch_pipeline_runs(pipeline_id).await
    }

    async fn list_builds(&self) -> Result<Vec<BuildRecord>> {
        self.fetch_builds().await
    }

    async fn get_build_timeline(&self, build_id: i64) -> Result<Vec<TimelineRecord>> {
        self.fetch_build_timeline(build_id).await
    }
}
