//! Orchestrator abstraction
//!
//! Detects the CI system the process runs on and maps its environment
//! variables and REST APIs onto one set of facts: branch, pull request,
//! build URL, status, start time and logs.
//!
//! ```
//! use steplib::orchestrator::{detect, Environment, OrchestratorKind};
//!
//! let env = Environment::new().set("GITHUB_ACTIONS", "true");
//! assert_eq!(detect(&env), OrchestratorKind::GitHubActions);
//! ```

mod azure;
mod env;
mod github_actions;
mod jenkins;
mod types;
mod unknown;

pub use azure::AzureDevOps;
pub use env::{Environment, NOT_AVAILABLE};
pub use github_actions::GitHubActions;
pub use jenkins::Jenkins;
pub use types::{
    zero_time, BuildReason, BuildStatus, ChangeSet, OrchestratorFacts, OrchestratorKind,
    PullRequestConfig,
};
pub use unknown::UnknownOrchestrator;

use crate::errors::ErrorKind;
use crate::infrastructure::http::{
    ApiClient, BlockingRuntime, CancellationToken, HttpError, HttpSettings, HttpTransport,
    ReqwestTransport, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Orchestrator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// Missing or invalid settings
    #[error("orchestrator configuration error: {0}")]
    Configuration(String),

    /// REST call failed or returned unusable data
    #[error("orchestrator API error: {0}")]
    Remote(String),

    /// The request was cancelled
    #[error("orchestrator request cancelled: {0}")]
    Cancelled(String),
}

impl OrchestratorError {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Remote(_) | Self::Cancelled(_) => ErrorKind::Remote,
        }
    }
}

impl From<HttpError> for OrchestratorError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Cancelled { .. } => Self::Cancelled(e.to_string()),
            HttpError::Runtime(_) => Self::Configuration(e.to_string()),
            other => Self::Remote(other.to_string()),
        }
    }
}

/// Credentials and HTTP settings for the orchestrator APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Token for the GitHub REST API
    pub github_token: String,
    /// Personal access token for Azure DevOps
    pub azure_token: String,
    /// Jenkins user
    pub jenkins_user: String,
    /// Jenkins API token
    pub jenkins_token: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retries after a failed request
    pub max_retries: u32,
    /// Aborts in-flight requests when fired
    #[serde(skip)]
    pub cancellation: Option<CancellationToken>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            github_token: String::new(),
            azure_token: String::new(),
            jenkins_user: String::new(),
            jenkins_token: String::new(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_retries: DEFAULT_MAX_RETRIES,
            cancellation: None,
        }
    }
}

impl Options {
    /// Sets the GitHub token.
    #[must_use]
    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = token.into();
        self
    }

    /// Sets the Azure DevOps token.
    #[must_use]
    pub fn with_azure_token(mut self, token: impl Into<String>) -> Self {
        self.azure_token = token.into();
        self
    }

    /// Sets the Jenkins user and API token.
    #[must_use]
    pub fn with_jenkins_credentials(
        mut self,
        user: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        self.jenkins_user = user.into();
        self.jenkins_token = token.into();
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Uses `token` to cancel requests.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Timeout and retry settings for [`ApiClient`].
    #[must_use]
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            ..HttpSettings::default()
        }
    }
}

/// Facts about the CI system a build runs on.
///
/// String accessors never fail; facts that are not available are reported
/// as [`NOT_AVAILABLE`]. Accessors backed by REST calls return errors for
/// the failing call only and cache successful responses.
pub trait OrchestratorProvider: fmt::Debug + Send + Sync {
    /// Sets credentials and HTTP settings; may be called again.
    fn configure(&self, options: &Options) -> Result<(), OrchestratorError>;

    /// Which CI system this is.
    fn kind(&self) -> OrchestratorKind;

    /// Agent or server version.
    fn orchestrator_version(&self) -> String;

    /// Branch being built.
    fn branch(&self) -> String;

    /// Full git reference, e.g. `refs/heads/main`.
    fn git_reference(&self) -> String;

    /// Repository URL.
    fn repo_url(&self) -> String;

    /// URL of this build.
    fn build_url(&self) -> String;

    /// URL of the job or pipeline definition.
    fn job_url(&self) -> String;

    /// Job name.
    fn job_name(&self) -> String;

    /// Build id as shown in the UI.
    fn build_id(&self) -> String;

    /// Commit being built.
    fn commit_sha(&self) -> String;

    /// Current stage.
    fn stage_name(&self) -> String;

    /// Outcome of the build so far.
    fn build_status(&self) -> Result<BuildStatus, OrchestratorError>;

    /// Why the build was started.
    fn build_reason(&self) -> Result<BuildReason, OrchestratorError>;

    /// Start of the pipeline in UTC.
    fn pipeline_start_time(&self) -> Result<DateTime<Utc>, OrchestratorError>;

    /// Commits that are part of the build.
    fn change_sets(&self) -> Result<Vec<ChangeSet>, OrchestratorError>;

    /// Complete log output of the build so far.
    fn full_logs(&self) -> Result<Vec<u8>, OrchestratorError>;

    /// Pull request branches and key.
    fn pull_request_config(&self) -> PullRequestConfig;

    /// True when the build validates a pull request.
    fn is_pull_request(&self) -> bool;
}

/// Picks the CI system from `env`.
///
/// Probes Azure DevOps, GitHub Actions and Jenkins in that order.
#[must_use]
pub fn detect(env: &Environment) -> OrchestratorKind {
    if env.is_set("AZURE_HTTP_USER_AGENT") {
        OrchestratorKind::AzureDevOps
    } else if env.is_true("GITHUB_ACTION") || env.is_true("GITHUB_ACTIONS") {
        OrchestratorKind::GitHubActions
    } else if env.any_set(&["JENKINS_HOME", "JENKINS_URL"]) {
        OrchestratorKind::Jenkins
    } else {
        OrchestratorKind::Unknown
    }
}

/// Creates the provider for the CI system detected in `env`.
#[must_use]
pub fn new_provider(
    env: Environment,
    transport: Arc<dyn HttpTransport>,
) -> Arc<dyn OrchestratorProvider> {
    let kind = detect(&env);
    tracing::debug!(orchestrator = %kind, "Detected orchestrator");
    match kind {
        OrchestratorKind::AzureDevOps => Arc::new(AzureDevOps::new(env, transport)),
        OrchestratorKind::GitHubActions => Arc::new(GitHubActions::new(env, transport)),
        OrchestratorKind::Jenkins => Arc::new(Jenkins::new(env, transport)),
        OrchestratorKind::Unknown => Arc::new(UnknownOrchestrator::new()),
    }
}

static PROVIDER: Lazy<RwLock<Option<Arc<dyn OrchestratorProvider>>>> =
    Lazy::new(|| RwLock::new(None));

/// Process-wide provider, detected from the process environment on first use.
pub fn get_orchestrator_config() -> Result<Arc<dyn OrchestratorProvider>, OrchestratorError> {
    if let Some(provider) = PROVIDER.read().as_ref() {
        return Ok(Arc::clone(provider));
    }

    let mut slot = PROVIDER.write();
    if let Some(provider) = slot.as_ref() {
        return Ok(Arc::clone(provider));
    }
    let transport = ReqwestTransport::new()
        .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;
    let provider = new_provider(Environment::from_process(), Arc::new(transport));
    *slot = Some(Arc::clone(&provider));
    Ok(provider)
}

/// Installs the process-wide provider unless one exists; returns the active one.
pub fn init_orchestrator(
    env: Environment,
    transport: Arc<dyn HttpTransport>,
) -> Arc<dyn OrchestratorProvider> {
    let mut slot = PROVIDER.write();
    match slot.as_ref() {
        Some(provider) => Arc::clone(provider),
        None => {
            let provider = new_provider(env, transport);
            *slot = Some(Arc::clone(&provider));
            provider
        }
    }
}

/// Drops the process-wide provider. Test use only.
#[doc(hidden)]
pub fn reset_orchestrator() {
    *PROVIDER.write() = None;
}

/// HTTP access shared by the REST-backed providers.
#[derive(Debug)]
pub(crate) struct Remote {
    transport: Arc<dyn HttpTransport>,
    client: RwLock<Option<ApiClient>>,
    runtime: BlockingRuntime,
}

impl Remote {
    pub(crate) fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            client: RwLock::new(None),
            runtime: BlockingRuntime::new(),
        }
    }

    /// Replaces the client; `build` adds credentials to a client carrying
    /// the settings from `options`.
    pub(crate) fn configure(&self, options: &Options, build: impl FnOnce(ApiClient) -> ApiClient) {
        let mut client =
            ApiClient::new(Arc::clone(&self.transport)).with_settings(options.http_settings());
        if let Some(token) = &options.cancellation {
            client = client.with_cancellation(token.clone());
        }
        *self.client.write() = Some(build(client));
    }

    pub(crate) fn is_configured(&self) -> bool {
        self.client.read().is_some()
    }

    /// Configured client, or an anonymous one with default settings.
    pub(crate) fn client(&self) -> ApiClient {
        self.client
            .read()
            .clone()
            .unwrap_or_else(|| ApiClient::new(Arc::clone(&self.transport)))
    }

    pub(crate) fn block_on<F, T>(&self, future: F) -> Result<T, OrchestratorError>
    where
        F: Future<Output = Result<T, HttpError>>,
    {
        Ok(self.runtime.block_on(future)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::MockTransport;
    use serial_test::serial;

    #[test]
    fn test_detection_order() {
        let all = Environment::new()
            .set("AZURE_HTTP_USER_AGENT", "agent")
            .set("GITHUB_ACTIONS", "true")
            .set("JENKINS_URL", "https://jenkins");
        assert_eq!(detect(&all), OrchestratorKind::AzureDevOps);

        let github_jenkins = Environment::new()
            .set("GITHUB_ACTIONS", "true")
            .set("JENKINS_URL", "https://jenkins");
        assert_eq!(detect(&github_jenkins), OrchestratorKind::GitHubActions);

        let disabled_github = Environment::new()
            .set("GITHUB_ACTIONS", "false")
            .set("JENKINS_HOME", "/var/lib/jenkins");
        assert_eq!(detect(&disabled_github), OrchestratorKind::Jenkins);

        assert_eq!(detect(&Environment::new()), OrchestratorKind::Unknown);
    }

    #[test]
    fn test_options_settings() {
        let options = Options::default()
            .with_timeout(Duration::from_secs(3))
            .with_max_retries(1);
        let settings = options.http_settings();
        assert_eq!(settings.timeout, Duration::from_secs(3));
        assert_eq!(settings.max_retries, 1);
        assert_eq!(Options::default().http_settings().timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_http_errors_map_to_kinds() {
        let cancelled: OrchestratorError = HttpError::Cancelled {
            url: "https://x".to_string(),
        }
        .into();
        assert!(matches!(cancelled, OrchestratorError::Cancelled(_)));

        let status: OrchestratorError = HttpError::Status {
            url: "https://x".to_string(),
            status: 500,
            body: String::new(),
        }
        .into();
        assert_eq!(status.kind(), ErrorKind::Remote);

        let nested: OrchestratorError = HttpError::Runtime("nested".to_string()).into();
        assert_eq!(nested.kind(), ErrorKind::Configuration);
    }

    #[test]
    #[serial]
    fn test_singleton_is_initialized_once() {
        reset_orchestrator();
        let jenkins = Environment::new().set("JENKINS_URL", "https://jenkins");
        let first = init_orchestrator(jenkins, Arc::new(MockTransport::new()));
        assert_eq!(first.kind(), OrchestratorKind::Jenkins);

        let second = init_orchestrator(Environment::new(), Arc::new(MockTransport::new()));
        assert_eq!(second.kind(), OrchestratorKind::Jenkins);
        assert_eq!(
            get_orchestrator_config().unwrap().kind(),
            OrchestratorKind::Jenkins
        );
        reset_orchestrator();
    }
}
