use std::collections::HashMap;

use serde::{
    Deserialize,
    Serialize,
};

use crate::types::has_scheme;

pub const NOT_EMPTY_MESSAGE: &str = "Please set a value for this field!";
pub const NO_PROTOCOL_MESSAGE: &str = "Please specify a protocol for the URL, e.g. \"http://\".";
pub const CONNECTION_BAD_MESSAGE: &str = "Unable to establish connection.";

/// Step field type, used by hosts that render a form for the step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigFieldType {
    /// Single-line text input
    Text,
    /// Hidden input
    Password,
    /// URL input, warned about when the scheme is missing
    Url,
    /// Boolean checkbox
    Boolean,
    /// Single selection filled from the server
    Select,
}

/// A single step field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigField {
    /// Field key (used in the step values map)
    pub key: String,
    /// Human-readable label
    pub label: String,
    pub description: Option<String>,
    pub field_type: ConfigFieldType,
    pub required: bool,
    pub default_value: Option<String>,
}

impl ConfigField {
    fn new(key: &str, label: &str, field_type: ConfigFieldType, required: bool) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            description: None,
            field_type,
            required,
            default_value: None,
        }
    }

    fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    fn default_value(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    /// Checks a single value the way the step form does
    pub fn check(&self, value: Option<&str>) -> FieldCheck {
        let value = value.unwrap_or_default();
        if value.is_empty() {
            return if self.required {
                FieldCheck::Error(NOT_EMPTY_MESSAGE.to_string())
            } else {
                FieldCheck::Ok
            };
        }

        if self.field_type == ConfigFieldType::Url && !has_scheme(value) {
            return FieldCheck::Warning(NO_PROTOCOL_MESSAGE.to_string());
        }

        FieldCheck::Ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldCheck {
    Ok,
    Warning(String),
    Error(String),
}

/// Field schema of one step kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub fields: Vec<ConfigField>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn add_field(mut self, field: ConfigField) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns every field that is not `Ok`, in schema order
    pub fn validate(&self, values: &HashMap<String, String>) -> Vec<(String, FieldCheck)> {
        self.fields
            .iter()
            .filter_map(|field| {
                match field.check(values.get(&field.key).map(String::as_str)) {
                    FieldCheck::Ok => None,
                    check => Some((field.key.clone(), check)),
                }
            })
            .collect()
    }

    /// First blocking error, if any
    pub fn first_error(&self, values: &HashMap<String, String>) -> Option<(String, String)> {
        self.validate(values)
            .into_iter()
            .find_map(|(key, check)| match check {
                FieldCheck::Error(msg) => Some((key, msg)),
                _ => None,
            })
    }
}

fn connection_fields(schema: ConfigSchema) -> ConfigSchema {
    schema
        .add_field(
            ConfigField::new("server_url", "Server URL", ConfigFieldType::Url, true)
                .describe("RapidDeploy server URL (e.g., http://rapiddeploy.example.com:8090/MidVision)"),
        )
        .add_field(
            ConfigField::new(
                "authentication_token",
                "Authentication token",
                ConfigFieldType::Password,
                true,
            )
            .describe("RapidDeploy web service authentication token"),
        )
}

/// Server URL and token only, for lookups
pub fn connection_schema() -> ConfigSchema {
    connection_fields(ConfigSchema::new())
}

/// Connection plus the project, for target and package lookups
pub fn project_lookup_schema() -> ConfigSchema {
    connection_fields(ConfigSchema::new())
        .add_field(ConfigField::new("project", "Project", ConfigFieldType::Select, true))
}

pub fn deploy_schema() -> ConfigSchema {
    connection_fields(ConfigSchema::new())
        .add_field(ConfigField::new("project", "Project", ConfigFieldType::Select, true))
        .add_field(
            ConfigField::new("target", "Target", ConfigFieldType::Select, true)
                .describe("server.environment[.instance].application"),
        )
        .add_field(
            ConfigField::new("package_name", "Package name", ConfigFieldType::Text, false)
                .describe("Leave empty or 'latest' to deploy the newest package; ${VAR} placeholders are resolved"),
        )
        .add_field(
            ConfigField::new("asynchronous", "Run asynchronously", ConfigFieldType::Boolean, false)
                .default_value("false"),
        )
}

pub fn package_schema() -> ConfigSchema {
    connection_fields(ConfigSchema::new())
        .add_field(ConfigField::new("project", "Project", ConfigFieldType::Select, true))
        .add_field(ConfigField::new("package_name", "Package name", ConfigFieldType::Text, false))
        .add_field(
            ConfigField::new(
                "archive_extension",
                "Archive extension",
                ConfigFieldType::Select,
                true,
            )
            .default_value("jar"),
        )
        .add_field(
            ConfigField::new("asynchronous", "Run asynchronously", ConfigFieldType::Boolean, false)
                .default_value("false"),
        )
}

pub fn job_plan_schema() -> ConfigSchema {
    connection_fields(ConfigSchema::new())
        .add_field(ConfigField::new("job_plan", "Job plan", ConfigFieldType::Select, true))
        .add_field(
            ConfigField::new("asynchronous", "Run asynchronously", ConfigFieldType::Boolean, false)
                .default_value("false"),
        )
        .add_field(
            ConfigField::new(
                "show_individual_logs",
                "Show individual logs",
                ConfigFieldType::Boolean,
                false,
            )
            .default_value("false"),
        )
        .add_field(
            ConfigField::new("show_full_log", "Show full log", ConfigFieldType::Boolean, false)
                .default_value("false"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_required_field_must_be_set() {
        let schema = deploy_schema();
        let (key, msg) = schema
            .first_error(&values(&[("server_url", "http://rd")]))
            .unwrap();
        assert_eq!(key, "authentication_token");
        assert_eq!(msg, NOT_EMPTY_MESSAGE);
    }

    #[test]
    fn test_url_without_protocol_is_warning() {
        let schema = job_plan_schema();
        let checks = schema.validate(&values(&[
            ("server_url", "rd.example.com"),
            ("authentication_token", "tok"),
            ("job_plan", "[1] Nightly"),
        ]));
        assert_eq!(
            checks,
            vec![(
                "server_url".to_string(),
                FieldCheck::Warning(NO_PROTOCOL_MESSAGE.to_string())
            )]
        );
        assert!(schema
            .first_error(&values(&[
                ("server_url", "rd.example.com"),
                ("authentication_token", "tok"),
                ("job_plan", "[1] Nightly"),
            ]))
            .is_none());
    }

    #[test]
    fn test_project_lookup_needs_project() {
        let schema = project_lookup_schema();
        let (key, msg) = schema
            .first_error(&values(&[
                ("server_url", "http://rd"),
                ("authentication_token", "tok"),
            ]))
            .unwrap();
        assert_eq!(key, "project");
        assert_eq!(msg, NOT_EMPTY_MESSAGE);
    }

    #[test]
    fn test_optional_field_may_be_empty() {
        let schema = package_schema();
        let checks = schema.validate(&values(&[
            ("server_url", "https://rd"),
            ("authentication_token", "tok"),
            ("project", "shop"),
            ("archive_extension", "war"),
        ]));
        assert!(checks.is_empty());
    }
}
