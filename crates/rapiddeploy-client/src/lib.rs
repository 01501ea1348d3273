//! RapidDeploy client for build steps
//!
//! Submits package builds, deployments and job plans to a RapidDeploy
//! server, follows the job until it finishes and hands back an [`Outcome`]
//! with the job log.
//!
//! # Architecture
//!
//! - `transport` - authenticated HTTP calls
//! - `extract` - scraping of the server's XML/HTML responses
//! - `poller` - job status polling
//! - `client` - the operations used by build steps and form lookups
//! - `substitution` - `${NAME}` placeholders and the data dictionary
//!
//! # Example Usage
//!
//! ```no_run
//! use rapiddeploy_api::DeployRequest;
//! use rapiddeploy_client::{
//!     BuildEnvironment,
//!     ClientConfig,
//!     RapidDeployClient,
//!     StdoutConsole,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> rapiddeploy_api::DeployResult<()> {
//! let client = RapidDeployClient::connect("http://rd:8090", "token", &ClientConfig::default())?;
//! let request = DeployRequest {
//!     project: "shop".to_string(),
//!     target: "srv.env.app".to_string(),
//!     package_name: None,
//!     asynchronous: false,
//! };
//! let outcome = client
//!     .deploy(
//!         &request,
//!         &BuildEnvironment::from_process(),
//!         &StdoutConsole,
//!         &CancellationToken::new(),
//!     )
//!     .await;
//! assert!(outcome.success);
//! # Ok(())
//! # }
//! ```
//!
//! [`Outcome`]: rapiddeploy_api::Outcome

mod cache;
mod client;
mod config;
mod console;
mod extract;
mod poller;
mod substitution;
#[cfg(test)]
mod testing;
mod transport;
mod urls;

pub use cache::FormCache;
pub use client::{
    RapidDeployClient,
    RECENT_PACKAGES_LIMIT,
};
pub use config::ClientConfig;
pub use console::{
    BufferConsole,
    Console,
    StdoutConsole,
};
pub use extract::{
    extract_child_job_ids,
    extract_job_id,
    extract_job_status,
    extract_tag_values,
};
pub use poller::{
    next_step,
    JobPoller,
    LogOptions,
    PollOutcome,
    PollSchedule,
    PollStep,
};
pub use substitution::{
    replace_placeholders,
    BuildEnvironment,
};
pub use transport::{
    HttpMethod,
    HttpTransport,
    Transport,
};
