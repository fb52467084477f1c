use super::{
    zero_time, BuildReason, BuildStatus, ChangeSet, Options, OrchestratorError, OrchestratorKind,
    OrchestratorProvider, PullRequestConfig, NOT_AVAILABLE,
};
use chrono::{DateTime, Utc};

/// Provider used outside any known CI system.
///
/// Every string fact is `n/a`.
#[derive(Debug, Default)]
pub struct UnknownOrchestrator;

impl UnknownOrchestrator {
    /// Creates the provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn na() -> String {
    NOT_AVAILABLE.to_string()
}

impl OrchestratorProvider for UnknownOrchestrator {
    fn configure(&self, _options: &Options) -> Result<(), OrchestratorError> {
        tracing::debug!("No orchestrator detected, nothing to configure");
        Ok(())
    }

    fn kind(&self) -> OrchestratorKind {
        OrchestratorKind::Unknown
    }

    fn orchestrator_version(&self) -> String {
        na()
    }

    fn branch(&self) -> String {
        na()
    }

    fn git_reference(&self) -> String {
        na()
    }

    fn repo_url(&self) -> String {
        na()
    }

    fn build_url(&self) -> String {
        na()
    }

    fn job_url(&self) -> String {
        na()
    }

    fn job_name(&self) -> String {
        na()
    }

    fn build_id(&self) -> String {
        na()
    }

    fn commit_sha(&self) -> String {
        na()
    }

    fn stage_name(&self) -> String {
        na()
    }

    fn build_status(&self) -> Result<BuildStatus, OrchestratorError> {
        Ok(BuildStatus::Failure)
    }

    fn build_reason(&self) -> Result<BuildReason, OrchestratorError> {
        Ok(BuildReason::Unknown)
    }

    fn pipeline_start_time(&self) -> Result<DateTime<Utc>, OrchestratorError> {
        Ok(zero_time())
    }

    fn change_sets(&self) -> Result<Vec<ChangeSet>, OrchestratorError> {
        Ok(Vec::new())
    }

    fn full_logs(&self) -> Result<Vec<u8>, OrchestratorError> {
        Ok(Vec::new())
    }

    fn pull_request_config(&self) -> PullRequestConfig {
        PullRequestConfig {
            branch: na(),
            base: na(),
            key: na(),
        }
    }

    fn is_pull_request(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::OrchestratorFacts;

    #[test]
    fn test_everything_is_not_available() {
        let facts = OrchestratorFacts::collect(&UnknownOrchestrator::new());
        assert_eq!(facts.orchestrator, OrchestratorKind::Unknown);
        assert_eq!(facts.branch, "n/a");
        assert_eq!(facts.build_url, "n/a");
        assert_eq!(facts.pull_request_config.key, "n/a");
        assert_eq!(facts.pipeline_start_time, zero_time());
        assert!(facts.change_sets.is_empty());
        assert!(!facts.is_pull_request);
        assert!(UnknownOrchestrator::new().full_logs().unwrap().is_empty());
    }
}
