//! Jenkins provider

use super::{
    BuildReason, BuildStatus, ChangeSet, Environment, Options, OrchestratorError,
    OrchestratorKind, OrchestratorProvider, PullRequestConfig, Remote, NOT_AVAILABLE,
};
use crate::infrastructure::http::{Auth, HttpTransport};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

static MERGED_PULL_REQUEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Merge pull request #(\d+)").expect("valid regex"));

/// Jenkins pipelines.
///
/// Build metadata comes from `${BUILD_URL}api/json`, logs from
/// `${BUILD_URL}consoleText`. Git facts need the git plugin.
#[derive(Debug)]
pub struct Jenkins {
    env: Environment,
    remote: Remote,
    api_information: Mutex<Option<Value>>,
}

impl Jenkins {
    /// Provider reading `env` and calling the API through `transport`.
    #[must_use]
    pub fn new(env: Environment, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            env,
            remote: Remote::new(transport),
            api_information: Mutex::new(None),
        }
    }

    fn api_information(&self) -> Result<Value, OrchestratorError> {
        let mut cache = self.api_information.lock();
        if let Some(info) = cache.as_ref() {
            tracing::debug!("API information already fetched");
            return Ok(info.clone());
        }

        let url = format!("{}api/json", self.build_url());
        tracing::debug!(url = %url, "Fetching API information");
        let client = self.remote.client();
        let info: Value = self
            .remote
            .block_on(async { client.get_json(&url).await })?;
        Ok(cache.insert(info).clone())
    }
}

fn reason_for_cause(class: &str) -> BuildReason {
    match class {
        "hudson.model.Cause$UserIdCause" => BuildReason::Manual,
        "hudson.triggers.TimerTrigger$TimerTriggerCause" => BuildReason::Schedule,
        "jenkins.branch.BranchEventCause" => BuildReason::PullRequest,
        "org.jenkinsci.plugins.workflow.support.steps.build.BuildUpstreamCause" => {
            BuildReason::ResourceTrigger
        }
        _ => BuildReason::Unknown,
    }
}

/// First cause of the first `CauseAction`.
fn build_reason(info: &Value) -> BuildReason {
    info["actions"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|action| action["_class"] == "hudson.model.CauseAction")
        .and_then(|action| action["causes"].get(0))
        .and_then(|cause| cause["_class"].as_str())
        .map_or(BuildReason::Unknown, reason_for_cause)
}

fn change_sets(info: &Value) -> Vec<ChangeSet> {
    info["changeSets"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|set| set["kind"] == "git")
        .flat_map(|set| set["items"].as_array().into_iter().flatten())
        .map(|item| {
            let message = item["msg"].as_str().or_else(|| item["comment"].as_str());
            ChangeSet {
                commit_id: item["commitId"].as_str().unwrap_or_default().to_string(),
                timestamp: match &item["timestamp"] {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                },
                pr_number: message
                    .and_then(|m| MERGED_PULL_REQUEST.captures(m))
                    .and_then(|c| c[1].parse().ok()),
            }
        })
        .collect()
}

impl OrchestratorProvider for Jenkins {
    fn configure(&self, options: &Options) -> Result<(), OrchestratorError> {
        self.remote.configure(options, |client| {
            client.with_auth(Auth::Basic {
                user: options.jenkins_user.clone(),
                password: options.jenkins_token.clone(),
            })
        });
        tracing::debug!("Configured Jenkins provider");
        Ok(())
    }

    fn kind(&self) -> OrchestratorKind {
        OrchestratorKind::Jenkins
    }

    fn orchestrator_version(&self) -> String {
        self.env.get_or_na("JENKINS_VERSION")
    }

    fn branch(&self) -> String {
        self.env.get_or_na("GIT_BRANCH")
    }

    /// `PR-N` branches map to `refs/pull/N/head`, plain names to `refs/heads/…`.
    fn git_reference(&self) -> String {
        let branch = self.branch();
        if branch == NOT_AVAILABLE || branch.starts_with("refs/") {
            branch
        } else if let Some(number) = branch.strip_prefix("PR-") {
            format!("refs/pull/{number}/head")
        } else {
            format!("refs/heads/{branch}")
        }
    }

    fn repo_url(&self) -> String {
        self.env.get_or_na("GIT_URL")
    }

    fn build_url(&self) -> String {
        self.env.get_or_na("BUILD_URL")
    }

    fn job_url(&self) -> String {
        self.env.get_or_na("JOB_URL")
    }

    fn job_name(&self) -> String {
        self.env.get_or_na("JOB_NAME")
    }

    fn build_id(&self) -> String {
        self.env.get_or_na("BUILD_NUMBER")
    }

    fn commit_sha(&self) -> String {
        self.env.get_or_na("GIT_COMMIT")
    }

    fn stage_name(&self) -> String {
        self.env.get_or_na("STAGE_NAME")
    }

    fn build_status(&self) -> Result<BuildStatus, OrchestratorError> {
        let info = self.api_information()?;
        Ok(match info.get("result") {
            Some(Value::Null) => BuildStatus::InProgress,
            Some(result) if result == "SUCCESS" => BuildStatus::Success,
            Some(result) if result == "ABORTED" => BuildStatus::Aborted,
            // FAILURE, NOT_BUILT, UNSTABLE
            _ => BuildStatus::Failure,
        })
    }

    fn build_reason(&self) -> Result<BuildReason, OrchestratorError> {
        Ok(build_reason(&self.api_information()?))
    }

    fn pipeline_start_time(&self) -> Result<DateTime<Utc>, OrchestratorError> {
        let info = self.api_information()?;
        info["timestamp"]
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| {
                OrchestratorError::Remote("API information has no valid 'timestamp'".to_string())
            })
    }

    fn change_sets(&self) -> Result<Vec<ChangeSet>, OrchestratorError> {
        Ok(change_sets(&self.api_information()?))
    }

    fn full_logs(&self) -> Result<Vec<u8>, OrchestratorError> {
        let url = format!("{}consoleText", self.build_url());
        tracing::debug!(url = %url, "Fetching console log");
        let client = self.remote.client();
        let response = self.remote.block_on(async { client.get(&url).await })?;
        Ok(response.body)
    }

    fn pull_request_config(&self) -> PullRequestConfig {
        PullRequestConfig {
            branch: self.env.get_or_na("CHANGE_BRANCH"),
            base: self.env.get_or_na("CHANGE_TARGET"),
            key: self.env.get_or_na("CHANGE_ID"),
        }
    }

    fn is_pull_request(&self) -> bool {
        self.env.is_true("CHANGE_ID")
    }
}
