//! Azure DevOps provider

use super::{
    BuildReason, BuildStatus, ChangeSet, Environment, Options, OrchestratorError,
    OrchestratorKind, OrchestratorProvider, PullRequestConfig, Remote,
};
use crate::infrastructure::http::{Auth, HttpError, HttpTransport};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildInformation {
    start_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogIndex {
    count: Option<u64>,
}

/// Azure DevOps pipelines.
///
/// Build metadata and logs come from the build REST API of the project,
/// authenticated with a personal access token.
#[derive(Debug)]
pub struct AzureDevOps {
    env: Environment,
    remote: Remote,
    build: Mutex<Option<BuildInformation>>,
}

impl AzureDevOps {
    /// Provider reading `env` and calling the API through `transport`.
    #[must_use]
    pub fn new(env: Environment, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            env,
            remote: Remote::new(transport),
            build: Mutex::new(None),
        }
    }

    /// `…/_apis/build/builds/{BUILD_BUILDID}/` of the current build.
    fn builds_api_url(&self) -> String {
        format!(
            "{}{}/_apis/build/builds/{}/",
            self.env.get_or_na("SYSTEM_COLLECTIONURI"),
            self.env.get_or_na("SYSTEM_TEAMPROJECTID"),
            self.env.get_or_na("BUILD_BUILDID"),
        )
    }

    /// `{collection}{project}/{definition}`, the prefix of UI links.
    fn definition_url(&self) -> String {
        format!(
            "{}{}/{}",
            self.env.get_or_empty("SYSTEM_TEAMFOUNDATIONCOLLECTIONURI"),
            self.env.get_or_empty("SYSTEM_TEAMPROJECT"),
            self.env.get_or_empty("SYSTEM_DEFINITIONNAME"),
        )
    }

    fn build_information(&self) -> Result<BuildInformation, OrchestratorError> {
        let mut cache = self.build.lock();
        if let Some(build) = cache.as_ref() {
            tracing::debug!("Build information already fetched");
            return Ok(build.clone());
        }

        let url = self.builds_api_url();
        tracing::debug!(url = %url, "Fetching build information");
        let client = self.remote.client();
        let build: BuildInformation = self
            .remote
            .block_on(async { client.get_json(&url).await })?;
        Ok(cache.insert(build).clone())
    }
}

impl OrchestratorProvider for AzureDevOps {
    fn configure(&self, options: &Options) -> Result<(), OrchestratorError> {
        self.remote.configure(options, |client| {
            client.with_auth(Auth::Basic {
                user: String::new(),
                password: options.azure_token.clone(),
            })
        });
        tracing::debug!("Configured Azure DevOps provider");
        Ok(())
    }

    fn kind(&self) -> OrchestratorKind {
        OrchestratorKind::AzureDevOps
    }

    fn orchestrator_version(&self) -> String {
        self.env.get_or_na("AGENT_VERSION")
    }

    fn branch(&self) -> String {
        let reference = self.git_reference();
        reference
            .strip_prefix("refs/heads/")
            .unwrap_or(&reference)
            .to_string()
    }

    fn git_reference(&self) -> String {
        self.env.get_or_na("BUILD_SOURCEBRANCH")
    }

    fn repo_url(&self) -> String {
        self.env.get_or_na("BUILD_REPOSITORY_URI")
    }

    fn build_url(&self) -> String {
        format!(
            "{}/_build/results?buildId={}",
            self.definition_url(),
            self.env.get_or_na("BUILD_BUILDID")
        )
    }

    fn job_url(&self) -> String {
        format!(
            "{}/_build?definitionId={}",
            self.definition_url(),
            self.env.get_or_empty("SYSTEM_DEFINITIONID")
        )
    }

    fn job_name(&self) -> String {
        self.env.get_or_na("BUILD_REPOSITORY_NAME")
    }

    /// The build number shown in the UI, not the id used by the API.
    fn build_id(&self) -> String {
        self.env.get_or_na("BUILD_BUILDNUMBER")
    }

    fn commit_sha(&self) -> String {
        self.env.get_or_na("BUILD_SOURCEVERSION")
    }

    fn stage_name(&self) -> String {
        self.env.get_or_na("SYSTEM_STAGEDISPLAYNAME")
    }

    fn build_status(&self) -> Result<BuildStatus, OrchestratorError> {
        Ok(match self.env.get("AGENT_JOBSTATUS") {
            Some("Succeeded") => BuildStatus::Success,
            Some("Canceled") => BuildStatus::Aborted,
            // Failed, SucceededWithIssues
            _ => BuildStatus::Failure,
        })
    }

    fn build_reason(&self) -> Result<BuildReason, OrchestratorError> {
        Ok(match self.env.get("BUILD_REASON") {
            Some("Manual") => BuildReason::Manual,
            Some("Schedule") => BuildReason::Schedule,
            Some("PullRequest") => BuildReason::PullRequest,
            Some("ResourceTrigger" | "BuildCompletion") => BuildReason::ResourceTrigger,
            Some("IndividualCI" | "BatchedCI") => BuildReason::IndividualCi,
            _ => BuildReason::Unknown,
        })
    }

    fn pipeline_start_time(&self) -> Result<DateTime<Utc>, OrchestratorError> {
        let build = self.build_information()?;
        let start_time = build.start_time.ok_or_else(|| {
            OrchestratorError::Remote("build information has no 'startTime'".to_string())
        })?;
        DateTime::parse_from_rfc3339(&start_time)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                OrchestratorError::Remote(format!("invalid start time '{start_time}': {e}"))
            })
    }

    fn change_sets(&self) -> Result<Vec<ChangeSet>, OrchestratorError> {
        tracing::debug!("Change sets are not reported by Azure DevOps");
        Ok(Vec::new())
    }

    fn full_logs(&self) -> Result<Vec<u8>, OrchestratorError> {
        let logs_url = format!("{}logs", self.builds_api_url());
        let client = self.remote.client();
        self.remote.block_on(async {
            let index: LogIndex = client.get_json(&logs_url).await?;
            let Some(count) = index.count else {
                return Ok(None);
            };

            let mut logs = Vec::new();
            for i in 1..=count {
                let url = format!("{logs_url}/{i}");
                tracing::debug!(url = %url, "Fetching log");
                logs.extend(client.get(&url).await?.body);
            }
            Ok::<_, HttpError>(Some(logs))
        })?
        .ok_or_else(|| OrchestratorError::Remote(format!("log index '{logs_url}' has no 'count'")))
    }

    fn pull_request_config(&self) -> PullRequestConfig {
        let key = match self.env.get("SYSTEM_PULLREQUEST_PULLREQUESTNUMBER") {
            Some(number) => number.to_string(),
            None => self.env.get_or_na("SYSTEM_PULLREQUEST_PULLREQUESTID"),
        };
        PullRequestConfig {
            branch: self.env.get_or_empty("SYSTEM_PULLREQUEST_SOURCEBRANCH"),
            base: self.env.get_or_empty("SYSTEM_PULLREQUEST_TARGETBRANCH"),
            key,
        }
    }

    fn is_pull_request(&self) -> bool {
        self.env.get("BUILD_REASON") == Some("PullRequest")
    }
}
