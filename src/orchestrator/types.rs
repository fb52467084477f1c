//! Uniform facts reported by every orchestrator provider

use super::OrchestratorProvider;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// CI system a provider talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrchestratorKind {
    /// Azure DevOps
    AzureDevOps,
    /// GitHub Actions
    GitHubActions,
    /// Jenkins
    Jenkins,
    /// No known CI system
    Unknown,
}

impl OrchestratorKind {
    /// Display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AzureDevOps => "Azure",
            Self::GitHubActions => "GitHubActions",
            Self::Jenkins => "Jenkins",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for OrchestratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a build, aligned with Jenkins result names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    /// Finished successfully
    Success,
    /// Cancelled
    Aborted,
    /// Failed, or anything not mapped otherwise
    Failure,
    /// Still running
    InProgress,
}

impl BuildStatus {
    /// Wire name, e.g. `IN_PROGRESS`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Aborted => "ABORTED",
            Self::Failure => "FAILURE",
            Self::InProgress => "IN_PROGRESS",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a build was started, aligned with Azure DevOps build reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildReason {
    /// Started by a user
    Manual,
    /// Started by a timer
    Schedule,
    /// Pull request validation
    PullRequest,
    /// Triggered by another build or resource
    ResourceTrigger,
    /// Continuous integration push
    #[serde(rename = "IndividualCI")]
    IndividualCi,
    /// Not mapped
    Unknown,
}

impl BuildReason {
    /// Wire name, e.g. `IndividualCI`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "Manual",
            Self::Schedule => "Schedule",
            Self::PullRequest => "PullRequest",
            Self::ResourceTrigger => "ResourceTrigger",
            Self::IndividualCi => "IndividualCI",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Branches and key of the pull request being validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestConfig {
    /// Source branch
    pub branch: String,
    /// Target branch
    pub base: String,
    /// Number or id of the pull request
    pub key: String,
}

/// A commit that is part of the build.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    /// Commit SHA
    pub commit_id: String,
    /// Commit time as reported by the orchestrator
    pub timestamp: String,
    /// Pull request merged by this commit, if any
    pub pr_number: Option<u64>,
}

/// `0001-01-01T00:00:00Z`, reported when no start time is known.
#[must_use]
pub fn zero_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Every fact of a provider, gathered once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorFacts {
    /// Orchestrator kind
    pub orchestrator: OrchestratorKind,
    /// Agent or server version
    pub orchestrator_version: String,
    /// Branch name
    pub branch: String,
    /// Full git reference
    pub git_reference: String,
    /// Repository URL
    pub repo_url: String,
    /// Build URL
    pub build_url: String,
    /// Job or pipeline URL
    pub job_url: String,
    /// Job name
    pub job_name: String,
    /// Build id
    pub build_id: String,
    /// Build status
    pub build_status: BuildStatus,
    /// Build reason
    pub build_reason: BuildReason,
    /// Commit SHA
    pub commit_sha: String,
    /// Stage name
    pub stage_name: String,
    /// Pipeline start time
    pub pipeline_start_time: DateTime<Utc>,
    /// Pull request details
    pub pull_request_config: PullRequestConfig,
    /// True when validating a pull request
    pub is_pull_request: bool,
    /// Commits of the build
    pub change_sets: Vec<ChangeSet>,
}

impl OrchestratorFacts {
    /// Reads every fact from `provider`.
    ///
    /// Remote facts that cannot be fetched are logged and reported as
    /// `FAILURE`, `Unknown`, the zero time and no change sets.
    pub fn collect(provider: &dyn OrchestratorProvider) -> Self {
        let build_status = provider.build_status().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unable to determine build status");
            BuildStatus::Failure
        });
        let build_reason = provider.build_reason().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unable to determine build reason");
            BuildReason::Unknown
        });
        let pipeline_start_time = provider.pipeline_start_time().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unable to determine pipeline start time");
            zero_time()
        });
        let change_sets = provider.change_sets().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unable to determine change sets");
            Vec::new()
        });

        Self {
            orchestrator: provider.kind(),
            orchestrator_version: provider.orchestrator_version(),
            branch: provider.branch(),
            git_reference: provider.git_reference(),
            repo_url: provider.repo_url(),
            build_url: provider.build_url(),
            job_url: provider.job_url(),
            job_name: provider.job_name(),
            build_id: provider.build_id(),
            build_status,
            build_reason,
            commit_sha: provider.commit_sha(),
            stage_name: provider.stage_name(),
            pipeline_start_time,
            pull_request_config: provider.pull_request_config(),
            is_pull_request: provider.is_pull_request(),
            change_sets,
        }
    }
}
