//! Job status polling.
//!
//! `next_step` holds the whole decision logic and is pure; `JobPoller` drives
//! it with sleeps, one status request at a time.

use std::time::Duration;

use rapiddeploy_api::{
    DeployError,
    DeployResult,
    JobId,
    JobStatus,
    ServerEndpoint,
    StatusPhase,
};
use tokio_util::sync::CancellationToken;

use crate::console::Console;
use crate::extract;
use crate::transport::{
    HttpMethod,
    Transport,
};
use crate::urls;

pub const CHILD_LOG_MARKER: &str = "LOGS RELATED TO JOB ID: ";

/// Poll intervals, expressed in multiples of `unit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub unit: Duration,
    /// Interval while the job is running or waiting for approval
    pub short_units: u32,
    /// Interval while the job is scheduled for a future date
    pub long_units: u32,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            short_units: 30,
            long_units: 300,
        }
    }
}

impl PollSchedule {
    pub fn short(&self) -> Duration {
        self.unit * self.short_units
    }

    pub fn long(&self) -> Duration {
        self.unit * self.long_units
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Sleep for `interval`, then poll again
    Continue {
        interval: Duration,
        /// Print the job details page for this poll
        echo_details: bool,
    },
    Finish { success: bool },
}

/// Decides what to do after observing `status`.
///
/// Running resets to the short interval, pending approval keeps the current
/// one, scheduled switches to the long one. Everything else is terminal and
/// only `COMPLETED` counts as success.
pub fn next_step(status: &JobStatus, current: Duration, schedule: &PollSchedule) -> PollStep {
    match status.phase() {
        StatusPhase::Running => PollStep::Continue {
            interval: schedule.short(),
            echo_details: false,
        },
        StatusPhase::PendingApproval => PollStep::Continue {
            interval: current,
            echo_details: false,
        },
        StatusPhase::Scheduled => PollStep::Continue {
            interval: schedule.long(),
            echo_details: true,
        },
        StatusPhase::Succeeded => PollStep::Finish { success: true },
        StatusPhase::Failed => PollStep::Finish { success: false },
    }
}

/// Which logs to collect once the job is over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Append the logs of the jobs run inside a job plan to the result
    pub full_log: bool,
    /// Print each included job's log to the console as it is fetched
    pub individual_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub status: JobStatus,
    pub log: String,
}

pub struct JobPoller<'a, T: Transport + ?Sized> {
    transport: &'a T,
    endpoint: &'a ServerEndpoint,
    schedule: PollSchedule,
}

impl<'a, T: Transport + ?Sized> JobPoller<'a, T> {
    pub fn new(transport: &'a T, endpoint: &'a ServerEndpoint, schedule: PollSchedule) -> Self {
        Self {
            transport,
            endpoint,
            schedule,
        }
    }

    async fn get(&self, url: &str) -> DeployResult<String> {
        self.transport
            .send(HttpMethod::Get, url, self.endpoint.auth_token(), None)
            .await
    }

    /// Polls until the job reaches a terminal state, then collects its log.
    ///
    /// Transport failures end the wait immediately; they are not retried.
    pub async fn wait_for_completion(
        &self, job_id: &JobId, options: LogOptions, console: &dyn Console,
        cancel: &CancellationToken,
    ) -> DeployResult<PollOutcome> {
        let details_url = urls::job_details(self.endpoint, job_id);
        let mut interval = self.schedule.short();

        console.println(&format!(
            "Checking job status every {}...",
            describe(interval)
        ));

        let (status, details) = loop {
            if cancel.is_cancelled() {
                return Err(cancelled(job_id));
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled(job_id)),
                _ = tokio::time::sleep(interval) => {}
            }

            let details = self.get(&details_url).await?;
            let status = JobStatus::parse(extract::extract_job_status(&details).as_deref());
            tracing::debug!(job_id = %job_id, %status, "polled job status");
            console.println(&format!("Job status: {status}"));

            match next_step(&status, interval, &self.schedule) {
                PollStep::Continue {
                    interval: next,
                    echo_details,
                } => {
                    match status.phase() {
                        StatusPhase::PendingApproval => console.println(&format!(
                            "Job in a REQUESTED state. Approval may be required in RapidDeploy to continue with the execution, next check in {}...",
                            describe(next)
                        )),
                        StatusPhase::Scheduled => console.println(&format!(
                            "Job in a SCHEDULED state, the execution will start in a future date, next check in {}...",
                            describe(next)
                        )),
                        _ => console.println(&format!(
                            "Job running, next check in {}...",
                            describe(next)
                        )),
                    }
                    if echo_details {
                        console.println("Printing out job details: ");
                        console.println(&details);
                    }
                    interval = next;
                }
                PollStep::Finish { .. } => {
                    console.println(&format!("Job finished with status: {status}"));
                    break (status, details);
                }
            }
        };

        tracing::info!(job_id = %job_id, %status, "job finished");

        let mut log = self.get(&urls::job_log(self.endpoint, job_id)).await?;

        if (options.full_log || options.individual_logs) && !details.trim().is_empty() {
            let children = extract::extract_child_job_ids(&details);
            if options.full_log {
                log.push('\n');
            }
            for child in children {
                let child_log = self.get(&urls::job_log(self.endpoint, &child)).await?;
                if options.individual_logs {
                    console.println(&format!("{CHILD_LOG_MARKER}{child}"));
                    console.println(&child_log);
                }
                if options.full_log {
                    log.push_str(CHILD_LOG_MARKER);
                    log.push_str(child.as_str());
                    log.push('\n');
                    log.push_str(&child_log);
                }
            }
        }

        if status.phase() == StatusPhase::Succeeded {
            Ok(PollOutcome { status, log })
        } else {
            Err(DeployError::JobFailed {
                status: status.to_string(),
                log,
            })
        }
    }
}

fn cancelled(job_id: &JobId) -> DeployError {
    DeployError::Cancelled(format!("stopped waiting for job {job_id}"))
}

fn describe(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs == 0 {
        format!("{interval:?}")
    } else if secs % 60 == 0 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{secs} seconds")
    }
}
