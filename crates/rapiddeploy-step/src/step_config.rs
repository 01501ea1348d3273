//! Step file loading and merging with the command line

use std::collections::HashMap;
use std::path::Path;

use anyhow::{
    bail,
    Context,
};
use rapiddeploy_api::{
    BuildPackageRequest,
    ConfigSchema,
    DeployRequest,
    FieldCheck,
    JobPlanRequest,
};
use rapiddeploy_client::ClientConfig;
use serde::Deserialize;

use crate::cli::StepArgs;
use crate::interpolation::{
    from_env,
    interpolate_toml,
};

const DEFAULT_ARCHIVE_EXTENSION: &str = "jar";

/// Contents of the step file.
///
/// ```toml
/// [server]
/// url = "${RAPIDDEPLOY_URL:-http://rapiddeploy:8090/MidVision}"
/// token = "${RAPIDDEPLOY_TOKEN}"
///
/// [client]
/// poll_unit_ms = 1000
/// job_plan_order = "by-id-descending"
///
/// [step]
/// project = "shop"
/// target = "web01.prod.app"
/// package_name = "shop-${BUILD_NUMBER}"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub server: ServerSection,
    pub client: ClientConfig,
    pub step: StepSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub url: Option<String>,
    pub token: Option<String>,
}

/// Step values; `${NAME}` in `package_name` is resolved per run, not at load
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StepSection {
    pub project: Option<String>,
    pub target: Option<String>,
    pub package_name: Option<String>,
    pub archive_extension: Option<String>,
    pub job_plan: Option<String>,
    pub asynchronous: bool,
    pub show_individual_logs: bool,
    pub show_full_log: bool,
}

impl StepConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read step file {}", path.display()))?;
        Self::parse(&raw, from_env)
            .with_context(|| format!("Invalid step file {}", path.display()))
    }

    /// Only the `[server]` table is interpolated
    pub fn parse<F>(raw: &str, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut table: toml::Table = toml::from_str(raw)?;
        if let Some(server) = table.get_mut("server") {
            interpolate_toml(server, &lookup)?;
        }
        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Flags win over the file; boolean flags can only switch options on
    pub fn resolve(self, args: &StepArgs) -> ResolvedStep {
        let pick = |flag: &Option<String>, file: Option<String>| {
            flag.clone()
                .filter(|v| !v.trim().is_empty())
                .or(file)
        };

        ResolvedStep {
            server_url: pick(&args.server_url, self.server.url),
            token: pick(&args.token, self.server.token),
            project: pick(&args.project, self.step.project),
            target: pick(&args.target, self.step.target),
            package_name: pick(&args.package_name, self.step.package_name),
            archive_extension: pick(&args.archive_extension, self.step.archive_extension)
                .or_else(|| Some(DEFAULT_ARCHIVE_EXTENSION.to_string())),
            job_plan: pick(&args.job_plan, self.step.job_plan),
            asynchronous: args.asynchronous || self.step.asynchronous,
            show_individual_logs: args.show_individual_logs || self.step.show_individual_logs,
            show_full_log: args.show_full_log || self.step.show_full_log,
            client: self.client,
        }
    }
}

/// Everything one invocation needs
#[derive(Debug, Clone)]
pub struct ResolvedStep {
    pub server_url: Option<String>,
    pub token: Option<String>,
    pub project: Option<String>,
    pub target: Option<String>,
    pub package_name: Option<String>,
    pub archive_extension: Option<String>,
    pub job_plan: Option<String>,
    pub asynchronous: bool,
    pub show_individual_logs: bool,
    pub show_full_log: bool,
    pub client: ClientConfig,
}

impl ResolvedStep {
    fn values(&self) -> HashMap<String, String> {
        let mut values = HashMap::new();
        let mut put = |key: &str, value: Option<&String>| {
            if let Some(value) = value {
                values.insert(key.to_string(), value.trim().to_string());
            }
        };
        put("server_url", self.server_url.as_ref());
        put("authentication_token", self.token.as_ref());
        put("project", self.project.as_ref());
        put("target", self.target.as_ref());
        put("package_name", self.package_name.as_ref());
        put("archive_extension", self.archive_extension.as_ref());
        put("job_plan", self.job_plan.as_ref());

        for (key, flag) in [
            ("asynchronous", self.asynchronous),
            ("show_individual_logs", self.show_individual_logs),
            ("show_full_log", self.show_full_log),
        ] {
            values.insert(key.to_string(), flag.to_string());
        }
        values
    }

    /// Logs warnings and fails on the first missing required field
    pub fn validate(&self, schema: &ConfigSchema) -> anyhow::Result<()> {
        let values = self.values();
        for (key, check) in schema.validate(&values) {
            if let FieldCheck::Warning(message) = check {
                tracing::warn!(field = %key, "{message}");
            }
        }

        if let Some((key, message)) = schema.first_error(&values) {
            let label = schema
                .fields
                .iter()
                .find(|f| f.key == key)
                .map(|f| f.label.as_str())
                .unwrap_or(key.as_str());
            bail!("{label}: {message}");
        }
        Ok(())
    }

    pub fn connection(&self) -> (&str, &str) {
        (
            self.server_url.as_deref().unwrap_or_default(),
            self.token.as_deref().unwrap_or_default(),
        )
    }

    /// Project of a lookup; empty until validated
    pub fn project(&self) -> &str {
        self.project.as_deref().map(str::trim).unwrap_or_default()
    }

    pub fn deploy_request(&self) -> DeployRequest {
        DeployRequest {
            project: self.project.clone().unwrap_or_default(),
            target: self.target.clone().unwrap_or_default(),
            package_name: self.package_name.clone(),
            asynchronous: self.asynchronous,
        }
    }

    pub fn package_request(&self) -> BuildPackageRequest {
        BuildPackageRequest {
            project: self.project.clone().unwrap_or_default(),
            package_name: self.package_name.clone(),
            archive_extension: self
                .archive_extension
                .clone()
                .unwrap_or_else(|| DEFAULT_ARCHIVE_EXTENSION.to_string()),
            asynchronous: self.asynchronous,
        }
    }

    pub fn job_plan_request(&self) -> JobPlanRequest {
        JobPlanRequest {
            job_plan: self.job_plan.clone().unwrap_or_default(),
            asynchronous: self.asynchronous,
            show_individual_logs: self.show_individual_logs,
            show_full_log: self.show_full_log,
        }
    }
}
