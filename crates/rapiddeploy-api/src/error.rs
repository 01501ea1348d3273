use thiserror::Error;

/// Errors raised while talking to a RapidDeploy server
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// The server answered with a 4xx status
    #[error("HTTP {status}\nError calling RapidDeploy server on url: {url}\nCause: {body}")]
    RemoteCall {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("{0}")]
    JobSubmission(String),

    /// The job reached a terminal state other than `COMPLETED`
    #[error("RapidDeploy job failed with status {status}. Please check the output.\n{log}")]
    JobFailed { status: String, log: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployError {
    /// Log text carried by the error, if the job got far enough to produce one
    pub fn log(&self) -> Option<&str> {
        match self {
            DeployError::JobFailed { log, .. } => Some(log),
            _ => None,
        }
    }
}

pub type DeployResult<T> = Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_call_message_names_url() {
        let err = DeployError::RemoteCall {
            status: 404,
            url: "http://rd/ws/project/list".to_string(),
            body: "not found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("HTTP 404"));
        assert!(msg.contains("http://rd/ws/project/list"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_job_failed_carries_log() {
        let err = DeployError::JobFailed {
            status: "FAILED".to_string(),
            log: "step 3 exploded".to_string(),
        };
        assert_eq!(err.log(), Some("step 3 exploded"));
        assert!(err.to_string().contains("step 3 exploded"));
        assert_eq!(DeployError::Network("down".to_string()).log(), None);
    }
}
