use std::collections::HashMap;

use serde::Deserialize;

/// Envelope of Azure DevOps list endpoints (`{"count": n, "value": [...]}`).
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// A pipeline definition.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineSummary {
    pub id: i64,
    pub name: String,
    pub revision: i64,
}

/// Pipeline reference embedded in a run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineReference {
    pub id: i64,
    pub name: String,
}

/// One execution of a pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineRun {
    pub id: i64,
    pub name: String,
    pub state: String,
    pub result: Option<String>,
    pub created_date: Option<String>,
    pub finished_date: Option<String>,
    pub pipeline: PipelineReference,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DefinitionReference {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectReference {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepositoryReference {
    pub name: String,
    #[serde(rename = "type")]
    pub repo_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdentityReference {
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueueReference {
    pub name: String,
}

/// A build, as returned by `_apis/build/builds`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildRecord {
    pub id: i64,
    pub status: String,
    pub result: Option<String>,
    pub queue_time: Option<String>,
    pub start_time: Option<String>,
    pub finish_time: Option<String>,
    pub source_branch: String,
    pub definition: DefinitionReference,
    pub project: ProjectReference,
    pub repository: RepositoryReference,
    pub requested_by: IdentityReference,
    pub queue: QueueReference,
    pub reason: String,
    pub trigger_info: HashMap<String, String>,
}

impl BuildRecord {
    pub const STATUS_COMPLETED: &'static str = "completed";

    pub fn is_completed(&self) -> bool {
        self.status == Self::STATUS_COMPLETED
    }

    /// Branch recorded by the CI trigger, empty when the trigger did not set one.
    pub fn trigger_source_branch(&self) -> &str {
        self.trigger_info
            .get("ci.sourceBranch")
            .map_or("", String::as_str)
    }
}

/// Body of `_apis/build/builds/{id}/timeline`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TimelineResponse {
    pub records: Vec<TimelineRecord>,
}

/// Log attached to a timeline record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
#[allow(dead_code)]
pub struct LogReference {
    pub id: i64,
    #[serde(rename = "type")]
    pub log_type: String,
    pub url: String,
}

/// One node of a build timeline (stage, phase, job, task, ...).
///
/// Log, ordering and counter fields are decoded but not exported as labels.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(dead_code)]
pub struct TimelineRecord {
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub start_time: Option<String>,
    pub finish_time: Option<String>,
    pub result: Option<String>,
    pub worker_name: Option<String>,
    pub log: Option<LogReference>,
    pub order: Option<i64>,
    pub state: Option<String>,
    pub error_count: Option<i64>,
    pub warning_count: Option<i64>,
}

impl TimelineRecord {
    pub const JOB: &'static str = "Job";
    pub const TASK: &'static str = "Task";

    pub fn is_job(&self) -> bool {
        self.record_type == Self::JOB
    }

    pub fn is_task(&self) -> bool {
        self.record_type == Self::TASK
    }

    /// Agent name, `None` when absent or empty.
    pub fn worker(&self) -> Option<&str> {
        self.worker_name.as_deref().filter(|w| !w.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_build_with_nulls_and_missing_fields() {
        let json = r#"{
            "id": 42,
            "buildNumber": "20240101.1",
            "status": "inProgress",
            "result": null,
            "queueTime": "2024-01-01T10:00:00.1234567Z",
            "startTime": "2024-01-01T10:00:05Z",
            "definition": {"id": 3, "name": "ci"},
            "project": {"id": "p-1", "name": "proj"},
            "repository": {"id": "r-1", "name": "repo", "type": "TfsGit"},
            "requestedBy": {"displayName": "Jane Doe"},
            "triggerInfo": {"ci.sourceBranch": "refs/heads/main"}
        }"#;

        let build: BuildRecord = serde_json::from_str(json).unwrap();
        assert_eq!(build.id, 42);
        assert_eq!(build.result, None);
        assert_eq!(build.finish_time, None);
        assert_eq!(build.repository.repo_type, "TfsGit");
        assert_eq!(build.requested_by.display_name, "Jane Doe");
        assert_eq!(build.queue.name, "");
        assert_eq!(build.trigger_source_branch(), "refs/heads/main");
        assert!(!build.is_completed());
    }

    #[test]
    fn test_trigger_source_branch_defaults_to_empty() {
        let build = BuildRecord::default();
        assert_eq!(build.trigger_source_branch(), "");
    }

    #[test]
    fn test_decode_timeline_record() {
        let json = r#"{"records": [{
            "id": "T1",
            "parentId": "A",
            "type": "Task",
            "name": "compile",
            "workerName": "agent-1",
            "log": {"id": 5, "type": "Container", "url": "https://x/logs/5"},
            "order": 2,
            "errorCount": 0,
            "warningCount": 1
        }]}"#;

        let timeline: TimelineResponse = serde_json::from_str(json).unwrap();
        let record = &timeline.records[0];
        assert!(record.is_task());
        assert_eq!(record.parent_id.as_deref(), Some("A"));
        assert_eq!(record.worker(), Some("agent-1"));
        assert_eq!(record.warning_count, Some(1));
    }

    #[test]
    fn test_empty_worker_name_is_none() {
        let record = TimelineRecord {
            worker_name: Some(String::new()),
            ..TimelineRecord::default()
        };
        assert_eq!(record.worker(), None);
    }

    #[test]
    fn test_decode_pipeline_run_list() {
        let json = r#"{"count": 1, "value": [{
            "id": 11,
            "name": "20240101.2",
            "url": "https://x/runs/11",
            "state": "completed",
            "result": "succeeded",
            "createdDate": "2024-01-01T10:00:00.5Z",
            "finishedDate": "2024-01-01T10:01:00.5Z",
            "pipeline": {"id": 7, "name": "deploy"}
        }]}"#;

        let runs: ListResponse<PipelineRun> = serde_json::from_str(json).unwrap();
        assert_eq!(runs.value.len(), 1);
        assert_eq!(runs.value[0].pipeline.name, "deploy");
        assert_eq!(runs.value[0].finished_date.as_deref(), Some("2024-01-01T10:01:00.5Z"));
    }
}
