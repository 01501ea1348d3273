use std::time::Duration;

use rapiddeploy_api::JobPlanOrder;
use serde::{
    Deserialize,
    Serialize,
};

use crate::poller::PollSchedule;

/// Client tuning; every field has a default matching the server's usual setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Length of one poll unit in milliseconds
    pub poll_unit_ms: u64,
    pub poll_short_units: u32,
    pub poll_long_units: u32,
    pub job_plan_order: JobPlanOrder,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let schedule = PollSchedule::default();
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            poll_unit_ms: schedule.unit.as_millis() as u64,
            poll_short_units: schedule.short_units,
            poll_long_units: schedule.long_units,
            job_plan_order: JobPlanOrder::default(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn poll_schedule(&self) -> PollSchedule {
        PollSchedule {
            unit: Duration::from_millis(self.poll_unit_ms),
            short_units: self.poll_short_units,
            long_units: self.poll_long_units,
        }
    }
}
