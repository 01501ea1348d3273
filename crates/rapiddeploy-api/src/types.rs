use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use secrecy::{
    ExposeSecret,
    SecretString,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::error::{
    DeployError,
    DeployResult,
};

/// Placeholder key → value overrides forwarded with a deployment
pub type DataDictionary = BTreeMap<String, String>;

/// Base URL and token of a RapidDeploy server
pub struct ServerEndpoint {
    base_url: String,
    auth_token: SecretString,
}

impl ServerEndpoint {
    /// Normalizes the URL so it always carries a scheme (`http://` when none
    /// is given) and has no trailing slash.
    pub fn new(base_url: &str, auth_token: &str) -> DeployResult<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(DeployError::InvalidConfig(
                "Missing RapidDeploy server URL".to_string(),
            ));
        }
        if auth_token.trim().is_empty() {
            return Err(DeployError::InvalidConfig(
                "Missing RapidDeploy authentication token".to_string(),
            ));
        }

        let base_url = if has_scheme(trimmed) {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        Ok(Self {
            base_url,
            auth_token: SecretString::from(auth_token.to_string()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_token(&self) -> &str {
        self.auth_token.expose_secret()
    }

    /// Joins a server-relative path (starting with `/`) onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl fmt::Debug for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerEndpoint")
            .field("base_url", &self.base_url)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

pub fn has_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// `server.environment[.instance].application`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub server: String,
    pub environment: String,
    /// Absent in the three-segment form used by RapidDeploy 3.5 and later
    pub instance: Option<String>,
    pub application: String,
}

impl DeploymentTarget {
    /// Path segments in URL order
    pub fn segments(&self) -> Vec<&str> {
        let mut segments = vec![self.server.as_str(), self.environment.as_str()];
        if let Some(instance) = &self.instance {
            segments.push(instance);
        }
        segments.push(&self.application);
        segments
    }
}

impl FromStr for DeploymentTarget {
    type Err = DeployError;

    fn from_str(target: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = target.trim().split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid_target(target));
        }

        match parts.as_slice() {
            [server, environment, instance, application] => Ok(Self {
                server: server.to_string(),
                environment: environment.to_string(),
                instance: Some(instance.to_string()),
                application: application.to_string(),
            }),
            [server, environment, application] => Ok(Self {
                server: server.to_string(),
                environment: environment.to_string(),
                instance: None,
                application: application.to_string(),
            }),
            _ => Err(invalid_target(target)),
        }
    }
}

fn invalid_target(target: &str) -> DeployError {
    DeployError::InvalidConfig(format!(
        "Invalid target settings found! Target: '{target}' (expected server.environment[.instance].application)"
    ))
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments().join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job status as reported by the job details page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Submitted,
    Starting,
    Executing,
    Deploying,
    Queued,
    Requested,
    RequestedScheduled,
    Scheduled,
    Completed,
    Failed,
    Rejected,
    Cancelled,
    Unexecutable,
    TimedOut,
    Unknown,
    /// Anything the server reports that is not listed above
    Other(String),
    /// No status could be read from the response
    Missing,
}

/// How the poller treats a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPhase {
    Running,
    PendingApproval,
    Scheduled,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return JobStatus::Missing;
        };

        match raw {
            "SUBMITTED" => JobStatus::Submitted,
            "STARTING" => JobStatus::Starting,
            "EXECUTING" => JobStatus::Executing,
            "DEPLOYING" => JobStatus::Deploying,
            "QUEUED" => JobStatus::Queued,
            "REQUESTED" => JobStatus::Requested,
            "REQUESTED_SCHEDULED" => JobStatus::RequestedScheduled,
            "SCHEDULED" => JobStatus::Scheduled,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" => JobStatus::Failed,
            "REJECTED" => JobStatus::Rejected,
            "CANCELLED" => JobStatus::Cancelled,
            "UNEXECUTABLE" => JobStatus::Unexecutable,
            "TIMED_OUT" | "TIMEDOUT" => JobStatus::TimedOut,
            "UNKNOWN" => JobStatus::Unknown,
            other => JobStatus::Other(other.to_string()),
        }
    }

    pub fn phase(&self) -> StatusPhase {
        match self {
            JobStatus::Submitted
            | JobStatus::Starting
            | JobStatus::Executing
            | JobStatus::Deploying
            | JobStatus::Queued => StatusPhase::Running,
            JobStatus::Requested | JobStatus::RequestedScheduled => StatusPhase::PendingApproval,
            JobStatus::Scheduled => StatusPhase::Scheduled,
            JobStatus::Completed => StatusPhase::Succeeded,
            _ => StatusPhase::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase(), StatusPhase::Succeeded | StatusPhase::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::Starting => "STARTING",
            JobStatus::Executing => "EXECUTING",
            JobStatus::Deploying => "DEPLOYING",
            JobStatus::Queued => "QUEUED",
            JobStatus::Requested => "REQUESTED",
            JobStatus::RequestedScheduled => "REQUESTED_SCHEDULED",
            JobStatus::Scheduled => "SCHEDULED",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Rejected => "REJECTED",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Unexecutable => "UNEXECUTABLE",
            JobStatus::TimedOut => "TIMED_OUT",
            JobStatus::Unknown => "UNKNOWN",
            JobStatus::Other(raw) => raw,
            JobStatus::Missing => "<none>",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPlan {
    pub id: String,
    pub description: String,
}

impl JobPlan {
    /// Selection label, e.g. `[12] Nightly release`
    pub fn label(&self) -> String {
        format!("[{}] {}", self.id, self.description)
    }

    /// Resolves a selection label (or a bare id) back to the job plan id
    pub fn id_from_selection(selection: &str) -> DeployResult<String> {
        let selection = selection.trim();
        let id = match (selection.find('['), selection.find(']')) {
            (Some(open), Some(close)) if open < close => selection[open + 1..close].trim(),
            (None, None) => selection,
            _ => "",
        };

        if id.is_empty() {
            return Err(DeployError::InvalidConfig(format!(
                "Invalid job plan selection: '{selection}'"
            )));
        }
        Ok(id.to_string())
    }
}

/// Order in which job plans are offered for selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobPlanOrder {
    #[default]
    ByDescription,
    /// Newest (highest numeric id) first; non-numeric ids sort last
    ByIdDescending,
}

impl JobPlanOrder {
    pub fn sort(&self, plans: &mut [JobPlan]) {
        match self {
            JobPlanOrder::ByDescription => plans.sort_by(|a, b| a.description.cmp(&b.description)),
            JobPlanOrder::ByIdDescending => {
                plans.sort_by_key(|p| std::cmp::Reverse(p.id.trim().parse::<i64>().ok()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub project: String,
    pub target: String,
    pub package_name: Option<String>,
    pub asynchronous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPackageRequest {
    pub project: String,
    pub package_name: Option<String>,
    pub archive_extension: String,
    pub asynchronous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlanRequest {
    /// `[id] description` as offered for selection, or a bare id
    pub job_plan: String,
    pub asynchronous: bool,
    pub show_individual_logs: bool,
    pub show_full_log: bool,
}

/// Result handed back to the build step. Never an `Err`: failures are folded
/// into `success = false` with the cause kept in `error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub log: String,
    pub error: Option<DeployError>,
}

impl Outcome {
    pub fn succeeded(log: String) -> Self {
        Self {
            success: true,
            log,
            error: None,
        }
    }

    pub fn failed(error: DeployError) -> Self {
        Self {
            success: false,
            log: error.log().unwrap_or_default().to_string(),
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_defaults_scheme() {
        let endpoint = ServerEndpoint::new("rd.example.com:8090/", "tok").unwrap();
        assert_eq!(endpoint.base_url(), "http://rd.example.com:8090");
        assert_eq!(
            endpoint.url("/ws/project/list"),
            "http://rd.example.com:8090/ws/project/list"
        );
    }

    #[test]
    fn test_endpoint_keeps_https() {
        let endpoint = ServerEndpoint::new("https://rd.example.com", "tok").unwrap();
        assert_eq!(endpoint.base_url(), "https://rd.example.com");
    }

    #[test]
    fn test_endpoint_rejects_blank_fields() {
        assert!(matches!(
            ServerEndpoint::new("", "tok"),
            Err(DeployError::InvalidConfig(_))
        ));
        assert!(matches!(
            ServerEndpoint::new("http://rd", "  "),
            Err(DeployError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_endpoint_debug_hides_token() {
        let endpoint = ServerEndpoint::new("http://rd", "super-secret").unwrap();
        let debug = format!("{endpoint:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_target_four_segments() {
        let target: DeploymentTarget = "srv.env.inst.app".parse().unwrap();
        assert_eq!(target.instance.as_deref(), Some("inst"));
        assert_eq!(target.segments(), vec!["srv", "env", "inst", "app"]);
    }

    #[test]
    fn test_target_three_segments() {
        let target: DeploymentTarget = "srv.env.app".parse().unwrap();
        assert_eq!(target.instance, None);
        assert_eq!(target.segments(), vec!["srv", "env", "app"]);
        assert_eq!(target.to_string(), "srv.env.app");
    }

    #[test]
    fn test_target_rejects_other_shapes() {
        for bad in ["srv", "srv.env", "a.b.c.d.e", "srv..app", "srv.env.app.", ""] {
            assert!(
                bad.parse::<DeploymentTarget>().is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_status_phases() {
        for raw in ["SUBMITTED", "STARTING", "EXECUTING", "DEPLOYING", "QUEUED"] {
            assert_eq!(JobStatus::parse(Some(raw)).phase(), StatusPhase::Running);
        }
        for raw in ["REQUESTED", "REQUESTED_SCHEDULED"] {
            assert_eq!(
                JobStatus::parse(Some(raw)).phase(),
                StatusPhase::PendingApproval
            );
        }
        assert_eq!(
            JobStatus::parse(Some("SCHEDULED")).phase(),
            StatusPhase::Scheduled
        );
        assert_eq!(
            JobStatus::parse(Some("COMPLETED")).phase(),
            StatusPhase::Succeeded
        );
    }

    #[test]
    fn test_unknown_statuses_are_failures() {
        for raw in [
            "FAILED",
            "REJECTED",
            "CANCELLED",
            "UNEXECUTABLE",
            "TIMED_OUT",
            "TIMEDOUT",
            "UNKNOWN",
            "BATCHED",
            "completed",
        ] {
            let status = JobStatus::parse(Some(raw));
            assert_eq!(status.phase(), StatusPhase::Failed, "{raw}");
            assert!(status.is_terminal());
        }
        assert_eq!(JobStatus::parse(None), JobStatus::Missing);
        assert_eq!(JobStatus::parse(Some("  ")).phase(), StatusPhase::Failed);
    }

    #[test]
    fn test_job_plan_selection() {
        assert_eq!(JobPlan::id_from_selection("[12] Nightly").unwrap(), "12");
        assert_eq!(JobPlan::id_from_selection("7").unwrap(), "7");
        assert!(JobPlan::id_from_selection("[] Nothing").is_err());
        assert!(JobPlan::id_from_selection("12] broken").is_err());
    }

    #[test]
    fn test_job_plan_order() {
        let plan = |id: &str, description: &str| JobPlan {
            id: id.to_string(),
            description: description.to_string(),
        };
        let mut plans = vec![plan("2", "Beta"), plan("10", "Alpha"), plan("3", "Gamma")];

        JobPlanOrder::ByDescription.sort(&mut plans);
        let ids: Vec<_> = plans.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "2", "3"]);

        JobPlanOrder::ByIdDescending.sort(&mut plans);
        let ids: Vec<_> = plans.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "3", "2"]);
        assert_eq!(plans[0].label(), "[10] Alpha");
    }

    #[test]
    fn test_outcome_failed_keeps_log() {
        let outcome = Outcome::failed(DeployError::JobFailed {
            status: "FAILED".to_string(),
            log: "boom".to_string(),
        });
        assert!(!outcome.success);
        assert_eq!(outcome.log, "boom");
    }
}
