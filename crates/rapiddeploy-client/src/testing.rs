//! In-memory transport for unit tests

use std::collections::{
    HashMap,
    VecDeque,
};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rapiddeploy_api::{
    DeployError,
    DeployResult,
    ServerEndpoint,
};

use crate::poller::PollSchedule;
use crate::transport::{
    HttpMethod,
    Transport,
};

pub(crate) const BASE_URL: &str = "http://rd";

pub(crate) fn endpoint() -> ServerEndpoint {
    ServerEndpoint::new(BASE_URL, "tok").unwrap()
}

pub(crate) fn fast_schedule() -> PollSchedule {
    PollSchedule {
        unit: Duration::from_micros(1),
        ..PollSchedule::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub method: HttpMethod,
    pub url: String,
    pub auth_token: String,
    pub body: Option<String>,
}

/// Answers by path (query string ignored). Queued responses are consumed in
/// order and the last one repeats.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<DeployResult<String>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, body: &str) {
        self.push(path, Ok(body.to_string()));
    }

    pub fn fail(&self, path: &str, error: DeployError) {
        self.push(path, Err(error));
    }

    fn push(&self, path: &str, response: DeployResult<String>) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| path_of(&c.url) == path)
            .count()
    }
}

fn path_of(url: &str) -> &str {
    let path = url.strip_prefix(BASE_URL).unwrap_or(url);
    path.split('?').next().unwrap_or(path)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self, method: HttpMethod, url: &str, auth_token: &str, body: Option<String>,
    ) -> DeployResult<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            url: url.to_string(),
            auth_token: auth_token.to_string(),
            body,
        });

        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(path_of(url)).ok_or_else(|| {
            DeployError::Internal(format!("no scripted response for {url}"))
        })?;
        match queue.len() {
            0 => Err(DeployError::Internal(format!("no scripted response for {url}"))),
            1 => queue[0].clone(),
            _ => queue.pop_front().unwrap(),
        }
    }
}
