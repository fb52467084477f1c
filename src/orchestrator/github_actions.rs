//! GitHub Actions provider

use super::{
    zero_time, BuildReason, BuildStatus, ChangeSet, Environment, Options, OrchestratorError,
    OrchestratorKind, OrchestratorProvider, PullRequestConfig, Remote, NOT_AVAILABLE,
};
use crate::infrastructure::http::{ApiClient, Auth, HttpError, HttpTransport};
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_API_URL: &str = "https://api.github.com";
const MAX_CONCURRENT_LOG_FETCHES: usize = 10;

static WORKFLOW_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.github/workflows/([a-zA-Z0-9_-]+\.(yml|yaml))").expect("valid regex")
});

#[derive(Debug, Clone, Deserialize)]
struct WorkflowRun {
    run_started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct JobList {
    #[serde(default)]
    jobs: Vec<Job>,
}

#[derive(Debug, Clone, Deserialize)]
struct Job {
    id: u64,
    #[serde(default)]
    name: String,
    conclusion: Option<String>,
    runner_id: Option<u64>,
}

impl Job {
    /// PR check scaffolding has no runner; skipped jobs never ran.
    fn ran_on_runner(&self) -> bool {
        self.runner_id.unwrap_or(0) != 0 && self.conclusion.as_deref() != Some("skipped")
    }
}

/// GitHub Actions workflow runs.
///
/// Run and job data come from the REST API of the repository in
/// `GITHUB_REPOSITORY`, authenticated with a token.
#[derive(Debug)]
pub struct GitHubActions {
    env: Environment,
    remote: Remote,
    run: Mutex<Option<WorkflowRun>>,
    jobs: Mutex<Option<Vec<Job>>>,
}

impl GitHubActions {
    /// Provider reading `env` and calling the API through `transport`.
    #[must_use]
    pub fn new(env: Environment, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            env,
            remote: Remote::new(transport),
            run: Mutex::new(None),
            jobs: Mutex::new(None),
        }
    }

    /// `{api}/repos/{owner}/{repo}/actions`
    fn actions_url(&self) -> Result<String, OrchestratorError> {
        let repository = self.env.get_or_empty("GITHUB_REPOSITORY");
        let Some((owner, repo)) = repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
        else {
            return Err(OrchestratorError::Configuration(format!(
                "unable to determine owner and repository from GITHUB_REPOSITORY '{repository}'"
            )));
        };
        let api = self
            .env
            .get("GITHUB_API_URL")
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_URL);
        Ok(format!(
            "{}/repos/{owner}/{repo}/actions",
            api.trim_end_matches('/')
        ))
    }

    fn run_id(&self) -> Result<u64, OrchestratorError> {
        let id = self.env.get_or_na("GITHUB_RUN_ID");
        id.parse().map_err(|_| {
            OrchestratorError::Configuration(format!("invalid GITHUB_RUN_ID value '{id}'"))
        })
    }

    fn run_data(&self) -> Result<WorkflowRun, OrchestratorError> {
        let mut cache = self.run.lock();
        if let Some(run) = cache.as_ref() {
            return Ok(run.clone());
        }

        let url = format!("{}/runs/{}", self.actions_url()?, self.run_id()?);
        tracing::debug!(url = %url, "Fetching workflow run");
        let client = self.remote.client();
        let run: WorkflowRun = self
            .remote
            .block_on(async { client.get_json(&url).await })?;
        Ok(cache.insert(run).clone())
    }

    /// Jobs of the current run that ran on a runner, in API order.
    fn jobs(&self) -> Result<Vec<Job>, OrchestratorError> {
        let mut cache = self.jobs.lock();
        if let Some(jobs) = cache.as_ref() {
            return Ok(jobs.clone());
        }

        let url = format!(
            "{}/runs/{}/jobs?per_page=100",
            self.actions_url()?,
            self.run_id()?
        );
        tracing::debug!(url = %url, "Fetching workflow jobs");
        let client = self.remote.client();
        let list: JobList = self
            .remote
            .block_on(async { client.get_json(&url).await })?;

        let jobs: Vec<Job> = list.jobs.into_iter().filter(Job::ran_on_runner).collect();
        if jobs.is_empty() {
            return Err(OrchestratorError::Remote(format!(
                "no jobs found in response from '{url}'"
            )));
        }
        Ok(cache.insert(jobs).clone())
    }

    fn workflow_file(&self) -> Option<String> {
        let reference = self.env.get_or_empty("GITHUB_WORKFLOW_REF");
        let file = WORKFLOW_FILE
            .captures(&reference)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        if file.is_none() {
            tracing::debug!(
                workflow_ref = %reference,
                "Unable to determine workflow file name"
            );
        }
        file
    }
}

async fn fetch_job_log(client: &ApiClient, actions_url: &str, job: &Job) -> Result<Vec<u8>, HttpError> {
    let url = format!("{actions_url}/jobs/{}/logs", job.id);
    tracing::debug!(url = %url, job = %job.name, "Fetching job log");
    Ok(client.get(&url).await?.body)
}

impl OrchestratorProvider for GitHubActions {
    fn configure(&self, options: &Options) -> Result<(), OrchestratorError> {
        self.remote.configure(options, |client| {
            client
                .with_auth(Auth::Bearer(options.github_token.clone()))
                .with_header("Accept", "application/vnd.github+json")
                .with_header("X-GitHub-Api-Version", "2022-11-28")
        });
        tracing::debug!("Configured GitHub Actions provider");
        Ok(())
    }

    fn kind(&self) -> OrchestratorKind {
        OrchestratorKind::GitHubActions
    }

    fn orchestrator_version(&self) -> String {
        NOT_AVAILABLE.to_string()
    }

    fn branch(&self) -> String {
        self.env.get_or_na("GITHUB_REF_NAME")
    }

    fn git_reference(&self) -> String {
        self.env.get_or_na("GITHUB_REF")
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/{}",
            self.env.get_or_na("GITHUB_SERVER_URL"),
            self.env.get_or_na("GITHUB_REPOSITORY")
        )
    }

    fn build_url(&self) -> String {
        format!("{}/actions/runs/{}", self.repo_url(), self.build_id())
    }

    fn job_url(&self) -> String {
        self.workflow_file()
            .map(|file| format!("{}/actions/workflows/{file}", self.repo_url()))
            .unwrap_or_default()
    }

    fn job_name(&self) -> String {
        self.env.get_or("GITHUB_WORKFLOW", "unknown")
    }

    fn build_id(&self) -> String {
        self.env.get_or_na("GITHUB_RUN_ID")
    }

    fn commit_sha(&self) -> String {
        self.env.get_or_na("GITHUB_SHA")
    }

    fn stage_name(&self) -> String {
        self.env.get_or("GITHUB_JOB", "unknown")
    }

    /// Any failed job fails the run; otherwise any cancelled job aborts it.
    fn build_status(&self) -> Result<BuildStatus, OrchestratorError> {
        let jobs = self.jobs()?;
        let has = |conclusion: &str| {
            jobs.iter()
                .any(|j| j.conclusion.as_deref() == Some(conclusion))
        };
        Ok(if has("failure") {
            BuildStatus::Failure
        } else if has("cancelled") {
            BuildStatus::Aborted
        } else {
            BuildStatus::Success
        })
    }

    fn build_reason(&self) -> Result<BuildReason, OrchestratorError> {
        Ok(match self.env.get("GITHUB_EVENT_NAME") {
            Some("workflow_dispatch") => BuildReason::Manual,
            Some("schedule") => BuildReason::Schedule,
            Some("pull_request") => BuildReason::PullRequest,
            Some("workflow_call") => BuildReason::ResourceTrigger,
            Some("push") => BuildReason::IndividualCi,
            _ => BuildReason::Unknown,
        })
    }

    fn pipeline_start_time(&self) -> Result<DateTime<Utc>, OrchestratorError> {
        if !self.remote.is_configured() {
            tracing::debug!("GitHub Actions provider is not configured, unable to fetch run data");
            return Ok(zero_time());
        }
        Ok(self.run_data()?.run_started_at.unwrap_or_else(zero_time))
    }

    fn change_sets(&self) -> Result<Vec<ChangeSet>, OrchestratorError> {
        tracing::debug!("Change sets are not reported by GitHub Actions");
        Ok(Vec::new())
    }

    /// Logs of every job except the last one, which is the running job.
    fn full_logs(&self) -> Result<Vec<u8>, OrchestratorError> {
        if !self.remote.is_configured() {
            tracing::debug!("GitHub Actions provider is not configured, unable to fetch logs");
            return Ok(Vec::new());
        }

        let mut jobs = self.jobs()?;
        jobs.pop();
        let actions_url = self.actions_url()?;
        let client = self.remote.client();

        let logs: Vec<Vec<u8>> = self.remote.block_on(
            futures::stream::iter(&jobs)
                .map(|job| fetch_job_log(&client, &actions_url, job))
                .buffered(MAX_CONCURRENT_LOG_FETCHES)
                .try_collect(),
        )?;
        Ok(logs.concat())
    }

    fn pull_request_config(&self) -> PullRequestConfig {
        let reference = self.env.get_or_na("GITHUB_REF");
        let key = reference.strip_prefix("refs/pull/").unwrap_or(&reference);
        let key = key.strip_suffix("/merge").unwrap_or(key);
        PullRequestConfig {
            branch: self.env.get_or_na("GITHUB_HEAD_REF"),
            base: self.env.get_or_na("GITHUB_BASE_REF"),
            key: key.to_string(),
        }
    }

    fn is_pull_request(&self) -> bool {
        self.env.is_true("GITHUB_HEAD_REF")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::infrastructure::http::{MockResponse, MockTransport};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    const ACTIONS: &str = "https://api.github.com/repos/SAP/jenkins-library/actions";
    const JOBS: &str =
        "https://api.github.com/repos/SAP/jenkins-library/actions/runs/11111/jobs?per_page=100";

    fn env() -> Environment {
        Environment::new()
            .set("GITHUB_ACTIONS", "true")
            .set("GITHUB_API_URL", "https://api.github.com")
            .set("GITHUB_SERVER_URL", "https://github.com")
            .set("GITHUB_REPOSITORY", "SAP/jenkins-library")
            .set("GITHUB_RUN_ID", "11111")
            .set("GITHUB_REF_NAME", "main")
            .set("GITHUB_REF", "refs/heads/main")
            .set("GITHUB_SHA", "ffac537e6cbbf934b08745a378932722df287a53")
            .set(
                "GITHUB_WORKFLOW_REF",
                "SAP/jenkins-library/.github/workflows/piper.yml@refs/heads/main",
            )
    }

    fn job(id: u64, conclusion: Option<&str>, runner_id: u64) -> serde_json::Value {
        json!({"id": id, "name": format!("job-{id}"), "conclusion": conclusion, "runner_id": runner_id})
    }

    fn configured(env: Environment, transport: &Arc<MockTransport>) -> GitHubActions {
        let provider = GitHubActions::new(env, transport.clone());
        provider
            .configure(&Options::default().with_github_token("ghp_token").with_max_retries(0))
            .unwrap();
        provider
    }

    #[test]
    fn test_environment_facts() {
        let p = GitHubActions::new(env(), Arc::new(MockTransport::new()));
        assert_eq!(p.repo_url(), "https://github.com/SAP/jenkins-library");
        assert_eq!(p.build_url(), "https://github.com/SAP/jenkins-library/actions/runs/11111");
        assert_eq!(
            p.job_url(),
            "https://github.com/SAP/jenkins-library/actions/workflows/piper.yml"
        );
        assert_eq!(p.branch(), "main");
        assert_eq!(p.job_name(), "unknown");
        assert_eq!(p.stage_name(), "unknown");
        assert_eq!(p.orchestrator_version(), "n/a");
        assert_eq!(p.actions_url().unwrap(), ACTIONS);
    }

    #[test]
    fn test_job_url_without_workflow_file() {
        let p = GitHubActions::new(
            env().set("GITHUB_WORKFLOW_REF", "SAP/jenkins-library/other@refs/heads/main"),
            Arc::new(MockTransport::new()),
        );
        assert_eq!(p.job_url(), "");
    }

    #[test]
    fn test_pull_request() {
        let p = GitHubActions::new(
            env()
                .set("GITHUB_REF", "refs/pull/42/merge")
                .set("GITHUB_HEAD_REF", "feat/test")
                .set("GITHUB_BASE_REF", "main")
                .set("GITHUB_EVENT_NAME", "pull_request"),
            Arc::new(MockTransport::new()),
        );
        assert!(p.is_pull_request());
        assert_eq!(p.pull_request_config().key, "42");
        assert_eq!(p.pull_request_config().branch, "feat/test");
        assert_eq!(p.build_reason().unwrap(), BuildReason::PullRequest);

        let push = GitHubActions::new(env().set("GITHUB_EVENT_NAME", "push"), Arc::new(MockTransport::new()));
        assert!(!push.is_pull_request());
        assert_eq!(push.build_reason().unwrap(), BuildReason::IndividualCi);
    }

    #[test]
    fn test_build_status() {
        let cases = [
            (vec![job(1, Some("success"), 1), job(2, Some("failure"), 1)], BuildStatus::Failure),
            (vec![job(1, Some("cancelled"), 1), job(2, Some("success"), 1)], BuildStatus::Aborted),
            (vec![job(1, Some("success"), 1), job(2, Some("failure"), 0)], BuildStatus::Success),
            (vec![job(1, Some("success"), 1), job(2, None, 1)], BuildStatus::Success),
        ];
        for (jobs, want) in cases {
            let transport = Arc::new(
                MockTransport::new().with_response(JOBS, MockResponse::json(&json!({"jobs": jobs}))),
            );
            let p = configured(env(), &transport);
            assert_eq!(p.build_status().unwrap(), want);
        }
    }

    #[test]
    fn test_no_jobs_is_remote_error() {
        let transport = Arc::new(MockTransport::new().with_response(
            JOBS,
            MockResponse::json(&json!({"jobs": [job(1, Some("skipped"), 0)]})),
        ));
        let p = configured(env(), &transport);
        assert_eq!(p.build_status().unwrap_err().kind(), ErrorKind::Remote);
    }

    #[test]
    fn test_pipeline_start_time() {
        let transport = Arc::new(MockTransport::new().with_response(
            format!("{ACTIONS}/runs/11111"),
            MockResponse::json(&json!({"run_started_at": "2023-08-11T07:28:24Z"})),
        ));
        assert_eq!(
            GitHubActions::new(env(), transport.clone()).pipeline_start_time().unwrap(),
            zero_time()
        );

        let p = configured(env(), &transport);
        assert_eq!(
            p.pipeline_start_time().unwrap().to_rfc3339(),
            "2023-08-11T07:28:24+00:00"
        );
        let request = &transport.requests()[0];
        assert!(matches!(&request.auth, Auth::Bearer(token) if token == "ghp_token"));
    }

    #[test]
    fn test_full_logs_skip_last_job_and_keep_order() {
        let transport = Arc::new(
            MockTransport::new()
                .with_response(
                    JOBS,
                    MockResponse::json(&json!({"jobs": [
                        job(1, Some("success"), 1),
                        job(2, Some("success"), 1),
                        job(3, Some("success"), 0),
                        job(4, None, 1),
                    ]})),
                )
                .with_response(
                    format!("{ACTIONS}/jobs/1/logs"),
                    MockResponse::redirect("https://results.example.com/logs/1"),
                )
                .with_response(
                    "https://results.example.com/logs/1",
                    MockResponse::ok("log 1\n").with_delay(Duration::from_millis(50)),
                )
                .with_response(format!("{ACTIONS}/jobs/2/logs"), MockResponse::ok("log 2\n")),
        );
        let p = configured(env(), &transport);

        assert_eq!(p.full_logs().unwrap(), b"log 1\nlog 2\n".to_vec());
        assert!(!transport
            .requested_urls()
            .contains(&format!("{ACTIONS}/jobs/4/logs")));

        let redirected = transport
            .requests()
            .into_iter()
            .find(|r| r.url.starts_with("https://results.example.com"))
            .unwrap();
        assert!(matches!(redirected.auth, Auth::None));
    }

    #[test]
    fn test_full_logs_fail_on_any_job() {
        let transport = Arc::new(
            MockTransport::new()
                .with_response(
                    JOBS,
                    MockResponse::json(&json!({"jobs": [
                        job(1, Some("success"), 1),
                        job(2, Some("success"), 1),
                        job(3, None, 1),
                    ]})),
                )
                .with_response(format!("{ACTIONS}/jobs/1/logs"), MockResponse::ok("log 1\n"))
                .with_response(format!("{ACTIONS}/jobs/2/logs"), MockResponse::status(410, "gone")),
        );
        let p = configured(env(), &transport);
        assert_eq!(p.full_logs().unwrap_err().kind(), ErrorKind::Remote);
    }

    #[test]
    fn test_full_logs_unconfigured_are_empty() {
        let transport = Arc::new(MockTransport::new());
        let p = GitHubActions::new(env(), transport.clone());
        assert!(p.full_logs().unwrap().is_empty());
        assert!(transport.requests().is_empty());
    }
}
