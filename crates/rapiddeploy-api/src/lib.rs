//! Shared vocabulary for the RapidDeploy step client: error taxonomy, domain
//! types and the step field schema.

pub mod error;
pub mod schema;
pub mod types;

pub use error::{
    DeployError,
    DeployResult,
};
pub use schema::{
    ConfigField,
    ConfigFieldType,
    ConfigSchema,
    FieldCheck,
};
pub use types::{
    BuildPackageRequest,
    DataDictionary,
    DeployRequest,
    DeploymentTarget,
    JobId,
    JobPlan,
    JobPlanOrder,
    JobPlanRequest,
    JobStatus,
    Outcome,
    ServerEndpoint,
    StatusPhase,
};
