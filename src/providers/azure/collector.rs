use std::time::Instant;

use log::{debug, info, warn};

use super::client::Gateway;
use super::formatter::{build_metrics, pipeline_metric, pipeline_run_metric};
use super::pool::WorkerPool;
use super::timeline::aggregate_timeline;
use super::types::BuildRecord;
use crate::error::Result;
use crate::metrics::MetricLine;

pub const DEFAULT_BUILD_LIMIT: usize = 100;

/// One fetch → aggregate → format pass over an Azure DevOps project.
///
/// Listing failures (pipelines, runs, builds) fail the whole cycle. Timeline
/// failures only drop that build's enrichment.
pub struct Collector<G> {
    gateway: G,
    pool: WorkerPool,
    build_limit: usize,
}

impl<G: Gateway> Collector<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            pool: WorkerPool::default(),
            build_limit: DEFAULT_BUILD_LIMIT,
        }
    }

    #[must_use]
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    /// Only the first `limit` builds of the listing are considered for
    /// timeline enrichment.
    #[must_use]
    pub fn with_build_limit(mut self, limit: usize) -> Self {
        self.build_limit = limit;
        self
    }

    #[cfg(test)]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Runs a full cycle and returns every metric line it produced.
    ///
    /// # Errors
    ///
    /// Returns the first error from the pipeline, pipeline-run or build
    /// listing calls.
    pub async fn collect(&self) -> Result<Vec<MetricLine>> {
        let started = Instant::now();

        let mut lines = self.collect_pipelines().await?;
        let pipeline_lines = lines.len();

        let builds = self.gateway.list_builds().await?;
        info!("Fetched {} builds", builds.len());

        lines.extend(builds.iter().flat_map(build_metrics));
        lines.extend(self.collect_timelines(&builds).await);

        debug!(
            "Cycle produced {} lines ({} pipeline, {} build/timeline) in {:?}",
            lines.len(),
            pipeline_lines,
            lines.len() - pipeline_lines,
            started.elapsed()
        );

        Ok(lines)
    }

    async fn collect_pipelines(&self) -> Result<Vec<MetricLine>> {
        let pipelines = self.gateway.list_pipelines().await?;
        info!("Fetched {} pipelines", pipelines.len());

        let mut lines = Vec::new();
        for pipeline in &pipelines {
            let runs = self.gateway.list_pipeline_runs(pipeline.id).await?;
            lines.extend(runs.iter().map(|run| pipeline_run_metric(run, &pipeline.name)));
            lines.push(pipeline_metric(pipeline, runs.len()));
        }

        Ok(lines)
    }

    /// Enriches the most recent completed builds with timeline metrics.
    async fn collect_timelines(&self, builds: &[BuildRecord]) -> Vec<MetricLine> {
        let eligible: Vec<BuildRecord> = builds
            .iter()
            .take(self.build_limit)
            .filter(|b| b.is_completed())
            .cloned()
            .collect();

        debug!(
            "Fetching timelines for {} builds ({} at a time)",
            eligible.len(),
            self.pool.size()
        );

        self.pool
            .run(eligible, |build| async move {
                match self.gateway.get_build_timeline(build.id).await {
                    Ok(records) => aggregate_timeline(&build, &records),
                    Err(e) => {
                        warn!("Error fetching timeline for build {}: {e}", build.id);
                        Vec::new()
                    }
                }
            })
            .await
    }
}
