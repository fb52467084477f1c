//! Infrastructure layer
//!
//! Configuration, logging and HTTP plumbing shared by the versioning engine
//! and the orchestrator providers.

pub mod config;
pub mod http;
mod logging;

pub use config::{Config, ConfigError, ProjectConfig};
pub use http::{
    ApiClient, Auth, BlockingRuntime, CancellationToken, HttpError, HttpSettings, HttpTransport,
    MockResponse, MockTransport, ReqwestTransport,
};
pub use logging::{env_filter, init_logging, LOG_ENV};
