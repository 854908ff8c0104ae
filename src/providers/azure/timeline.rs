use std::collections::{BTreeSet, HashMap};

use super::formatter::{
    build_worker_metric, job_duration_metric, record_elapsed, task_duration_metric, UNKNOWN_JOB,
};
use super::types::{BuildRecord, TimelineRecord};
use crate::metrics::MetricLine;

/// Derives worker, job and task metrics from one build's timeline.
///
/// Jobs and tasks form a two-level tree through `parentId`. A task whose
/// parent is not a `Job` record (nested stages, phases) is attributed to
/// the job name `"unknown"`. Duration lines are only emitted for strictly
/// positive durations; tasks without a worker are ignored.
pub fn aggregate_timeline(build: &BuildRecord, records: &[TimelineRecord]) -> Vec<MetricLine> {
    let jobs: HashMap<&str, &TimelineRecord> = records
        .iter()
        .filter(|r| r.is_job())
        .map(|r| (r.id.as_str(), r))
        .collect();

    let workers: BTreeSet<&str> = records.iter().filter_map(TimelineRecord::worker).collect();

    let mut lines: Vec<MetricLine> = workers
        .into_iter()
        .map(|worker| build_worker_metric(build, worker))
        .collect();

    for record in records {
        if record.is_job() {
            if let Some(seconds) = record_elapsed(build.id, record).and_then(|e| e.positive_seconds()) {
                lines.push(job_duration_metric(build, record, seconds));
            }
        } else if record.is_task() && record.worker().is_some() {
            let job_name = record
                .parent_id
                .as_deref()
                .and_then(|parent| jobs.get(parent))
                .map_or(UNKNOWN_JOB, |job| job.name.as_str());

            if let Some(seconds) = record_elapsed(build.id, record).and_then(|e| e.positive_seconds()) {
                lines.push(task_duration_metric(build, job_name, record, seconds));
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::azure::formatter::{BUILD_WORKER, JOB_DURATION, TASK_DURATION};
    use crate::providers::azure::types::DefinitionReference;

    const T0: &str = "2024-01-01T10:00:00Z";
    const T1: &str = "2024-01-01T10:00:20Z";

    fn build() -> BuildRecord {
        BuildRecord {
            id: 42,
            status: "completed".to_string(),
            definition: DefinitionReference {
                name: "ci".to_string(),
            },
            ..BuildRecord::default()
        }
    }

    fn record(
        id: &str,
        parent: Option<&str>,
        kind: &str,
        name: &str,
        worker: Option<&str>,
        result: &str,
    ) -> TimelineRecord {
        TimelineRecord {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            record_type: kind.to_string(),
            name: name.to_string(),
            start_time: Some(T0.to_string()),
            finish_time: Some(T1.to_string()),
            result: Some(result.to_string()),
            worker_name: worker.map(str::to_string),
            ..TimelineRecord::default()
        }
    }

    fn named<'a>(lines: &'a [MetricLine], name: &str) -> Vec<&'a MetricLine> {
        lines.iter().filter(|l| l.name() == name).collect()
    }

    #[test]
    fn test_task_resolves_parent_job_name() {
        let records = vec![
            record("A", None, "Job", "build", Some("agent-1"), "succeeded"),
            record("B", None, "Job", "test", Some("agent-2"), "failed"),
            record("T1", Some("A"), "Task", "compile", Some("agent-1"), "succeeded"),
            record("T2", Some("Z"), "Task", "lint", Some("agent-1"), "succeeded"),
        ];

        let lines = aggregate_timeline(&build(), &records);
        let tasks = named(&lines, TASK_DURATION);

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].label_value("taskName"), Some("compile"));
        assert_eq!(tasks[0].label_value("jobName"), Some("build"));
        assert_eq!(tasks[1].label_value("jobName"), Some("unknown"));
        assert_eq!(
            tasks[0].to_string(),
            r#"azure_devops_task_duration_seconds{buildId="42",definitionName="ci",jobName="build",taskName="compile",workerName="agent-1",result="succeeded"} 20.00"#
        );
    }

    #[test]
    fn test_job_duration_lines() {
        let records = vec![
            record("A", None, "Job", "build", Some("agent-1"), "succeeded"),
            record("B", None, "Job", "test", None, "failed"),
        ];

        let lines = aggregate_timeline(&build(), &records);
        let jobs = named(&lines, JOB_DURATION);

        assert_eq!(jobs.len(), 2);
        assert_eq!(
            jobs[0].to_string(),
            r#"azure_devops_job_duration_seconds{buildId="42",definitionName="ci",jobName="build",workerName="agent-1",result="succeeded"} 20.00"#
        );
        assert_eq!(jobs[1].label_value("workerName"), Some(""));
        assert_eq!(jobs[1].label_value("result"), Some("failed"));
    }

    #[test]
    fn test_distinct_workers_once_per_build() {
        let records = vec![
            record("A", None, "Job", "build", Some("agent-2"), "succeeded"),
            record("T1", Some("A"), "Task", "compile", Some("agent-2"), "succeeded"),
            record("T2", Some("A"), "Task", "pack", Some("agent-1"), "succeeded"),
            record("S", None, "Stage", "stage", Some(""), "succeeded"),
        ];

        let lines = aggregate_timeline(&build(), &records);
        let workers: Vec<_> = named(&lines, BUILD_WORKER)
            .into_iter()
            .filter_map(|l| l.label_value("workerName"))
            .collect();

        assert_eq!(workers, vec!["agent-1", "agent-2"]);
    }

    #[test]
    fn test_task_without_worker_is_ignored() {
        let records = vec![
            record("A", None, "Job", "build", None, "succeeded"),
            record("T1", Some("A"), "Task", "compile", None, "succeeded"),
        ];

        let lines = aggregate_timeline(&build(), &records);
        assert!(named(&lines, TASK_DURATION).is_empty());
        assert!(named(&lines, BUILD_WORKER).is_empty());
    }

    #[test]
    fn test_unfinished_and_unparsable_records_emit_no_duration() {
        let mut running = record("A", None, "Job", "build", Some("agent-1"), "");
        running.finish_time = None;
        let mut broken = record("T1", Some("A"), "Task", "compile", Some("agent-1"), "");
        broken.start_time = Some("garbage".to_string());
        let mut instant = record("T2", Some("A"), "Task", "noop", Some("agent-1"), "");
        instant.finish_time = Some(T0.to_string());

        let lines = aggregate_timeline(&build(), &[running, broken, instant]);

        assert!(named(&lines, JOB_DURATION).is_empty());
        assert!(named(&lines, TASK_DURATION).is_empty());
        assert_eq!(named(&lines, BUILD_WORKER).len(), 1);
    }

    #[test]
    fn test_empty_timeline() {
        assert!(aggregate_timeline(&build(), &[]).is_empty());
    }
}
