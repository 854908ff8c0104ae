//! Renders Azure DevOps entities into gauge lines.
//!
//! Label order is fixed per metric so the exposition stays diffable across
//! refreshes.

use chrono::TimeDelta;
use log::warn;

use super::duration::{resolve_opt, Elapsed};
use super::types::{BuildRecord, PipelineRun, PipelineSummary, TimelineRecord};
use crate::metrics::MetricLine;

pub const PIPELINE: &str = "azure_devops_pipeline";
pub const PIPELINE_RUN: &str = "azure_devops_pipeline_run";
pub const BUILD: &str = "azure_devops_build";
pub const BUILD_QUEUE_DURATION: &str = "azure_devops_build_queue_duration_seconds";
pub const BUILD_DURATION: &str = "azure_devops_build_duration_seconds";
pub const BUILD_WORKER: &str = "azure_devops_build_worker";
pub const JOB_DURATION: &str = "azure_devops_job_duration_seconds";
pub const TASK_DURATION: &str = "azure_devops_task_duration_seconds";

/// Job name used when a task's parent is not a top-level job.
pub const UNKNOWN_JOB: &str = "unknown";

pub fn pipeline_metric(pipeline: &PipelineSummary, run_count: usize) -> MetricLine {
    MetricLine::info(PIPELINE)
        .label("id", pipeline.id)
        .label("name", &pipeline.name)
        .label("revision", pipeline.revision)
        .label("runcount", run_count)
}

/// The run's duration is always embedded, including the `-1` sentinel.
pub fn pipeline_run_metric(run: &PipelineRun, pipeline_name: &str) -> MetricLine {
    let duration = match resolve_opt(run.created_date.as_deref(), run.finished_date.as_deref()) {
        Ok(elapsed) => elapsed.label_value(),
        Err(e) => {
            warn!("Pipeline run {}: {e}", run.id);
            Elapsed::Finished(TimeDelta::zero()).label_value()
        }
    };

    MetricLine::info(PIPELINE_RUN)
        .label("name", &run.name)
        .label("result", run.result.as_deref().unwrap_or_default())
        .label("durationinseconds", duration)
        .label("state", &run.state)
        .label("finishedDate", run.finished_date.as_deref().unwrap_or_default())
        .label("id", run.id)
        .label("pipelineid", run.pipeline.id)
        .label("pipelinename", pipeline_name)
}

/// Primary build line, plus queue and build durations when they are positive.
/// The build duration additionally requires the build to be completed.
pub fn build_metrics(build: &BuildRecord) -> Vec<MetricLine> {
    let result = build.result.as_deref().unwrap_or_default();

    let mut lines = vec![MetricLine::info(BUILD)
        .label("id", build.id)
        .label("status", &build.status)
        .label("result", result)
        .label("definitionName", &build.definition.name)
        .label("project", &build.project.name)
        .label("repository", &build.repository.name)
        .label("repoType", &build.repository.repo_type)
        .label("requestedBy", &build.requested_by.display_name)
        .label("sourceBranch", &build.source_branch)
        .label("pool", &build.queue.name)
        .label("reason", &build.reason)
        .label("triggerSourceBranch", build.trigger_source_branch())];

    let queued = positive_seconds(
        build.id,
        "queue",
        build.queue_time.as_deref(),
        build.start_time.as_deref(),
    );
    if let Some(seconds) = queued {
        lines.push(
            MetricLine::seconds(BUILD_QUEUE_DURATION, seconds)
                .label("id", build.id)
                .label("definitionName", &build.definition.name)
                .label("project", &build.project.name),
        );
    }

    let built = positive_seconds(
        build.id,
        "build",
        build.start_time.as_deref(),
        build.finish_time.as_deref(),
    );
    if let Some(seconds) = built.filter(|_| build.is_completed()) {
        lines.push(
            MetricLine::seconds(BUILD_DURATION, seconds)
                .label("id", build.id)
                .label("definitionName", &build.definition.name)
                .label("project", &build.project.name)
                .label("result", result),
        );
    }

    lines
}

fn positive_seconds(id: i64, what: &str, start: Option<&str>, end: Option<&str>) -> Option<f64> {
    match resolve_opt(start, end) {
        Ok(elapsed) => elapsed.positive_seconds(),
        Err(e) => {
            warn!("Build {id}: cannot compute {what} duration: {e}");
            None
        }
    }
}

pub fn build_worker_metric(build: &BuildRecord, worker_name: &str) -> MetricLine {
    MetricLine::info(BUILD_WORKER)
        .label("buildId", build.id)
        .label("definitionName", &build.definition.name)
        .label("project", &build.project.name)
        .label("workerName", worker_name)
}

pub fn job_duration_metric(build: &BuildRecord, job: &TimelineRecord, seconds: f64) -> MetricLine {
    MetricLine::seconds(JOB_DURATION, seconds)
        .label("buildId", build.id)
        .label("definitionName", &build.definition.name)
        .label("jobName", &job.name)
        .label("workerName", job.worker_name.as_deref().unwrap_or_default())
        .label("result", job.result.as_deref().unwrap_or_default())
}

pub fn task_duration_metric(
    build: &BuildRecord,
    job_name: &str,
    task: &TimelineRecord,
    seconds: f64,
) -> MetricLine {
    MetricLine::seconds(TASK_DURATION, seconds)
        .label("buildId", build.id)
        .label("definitionName", &build.definition.name)
        .label("jobName", job_name)
        .label("taskName", &task.name)
        .label("workerName", task.worker_name.as_deref().unwrap_or_default())
        .label("result", task.result.as_deref().unwrap_or_default())
}

/// Resolved elapsed time of a timeline record, `None` when its start is unparsable.
pub fn record_elapsed(build_id: i64, record: &TimelineRecord) -> Option<Elapsed> {
    match resolve_opt(record.start_time.as_deref(), record.finish_time.as_deref()) {
        Ok(elapsed) => Some(elapsed),
        Err(e) => {
            warn!(
                "Build {build_id}: {} '{}' has no usable start time: {e}",
                record.record_type, record.name
            );
            None
        }
    }
}
