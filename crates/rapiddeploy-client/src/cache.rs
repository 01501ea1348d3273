//! Cache for the lookups used to populate step forms

use std::future::Future;

use rapiddeploy_api::{
    DeployResult,
    JobPlan,
    ServerEndpoint,
};
use sha2::{
    Digest,
    Sha256,
};
use tokio::sync::Mutex;

#[derive(Default)]
struct CacheState {
    last_connection: Option<String>,
    projects: Option<Vec<String>>,
    job_plans: Option<Vec<JobPlan>>,
}

impl CacheState {
    fn switch_to(&mut self, connection: &str) {
        if self.last_connection.as_deref() != Some(connection) {
            if self.last_connection.is_some() {
                tracing::debug!("connection changed, dropping cached lookups");
            }
            *self = CacheState {
                last_connection: Some(connection.to_string()),
                ..CacheState::default()
            };
        }
    }
}

/// Projects and job plans, valid for one server URL and token.
///
/// Loads run under the lock so concurrent refreshes are serialized. Empty
/// results are not kept.
#[derive(Default)]
pub struct FormCache {
    state: Mutex<CacheState>,
}

impl FormCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn projects<F, Fut>(&self, connection: &str, load: F) -> DeployResult<Vec<String>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DeployResult<Vec<String>>>,
    {
        let mut state = self.state.lock().await;
        state.switch_to(connection);
        if let Some(projects) = &state.projects {
            return Ok(projects.clone());
        }

        let projects = load().await?;
        if !projects.is_empty() {
            state.projects = Some(projects.clone());
        }
        Ok(projects)
    }

    pub async fn job_plans<F, Fut>(&self, connection: &str, load: F) -> DeployResult<Vec<JobPlan>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DeployResult<Vec<JobPlan>>>,
    {
        let mut state = self.state.lock().await;
        state.switch_to(connection);
        if let Some(plans) = &state.job_plans {
            return Ok(plans.clone());
        }

        let plans = load().await?;
        if !plans.is_empty() {
            state.job_plans = Some(plans.clone());
        }
        Ok(plans)
    }

    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.projects = None;
        state.job_plans = None;
    }

    pub async fn last_connection(&self) -> Option<String> {
        self.state.lock().await.last_connection.clone()
    }
}

/// Identifies a server URL and token pair without keeping the token itself
pub fn connection_key(endpoint: &ServerEndpoint) -> String {
    let mut hasher = Sha256::new();
    hasher.update(endpoint.auth_token().as_bytes());
    format!("{}#{:x}", endpoint.base_url(), hasher.finalize())
}
