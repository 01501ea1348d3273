//! Build environment lookups: `${NAME}` placeholders in step fields and the
//! `@@KEY@@` data dictionary forwarded with deployments.

use std::collections::HashMap;
use std::sync::LazyLock;

use rapiddeploy_api::DataDictionary;
use regex::Regex;

use crate::console::Console;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^${}]+)\}").expect("Invalid regex pattern"));

static DICTIONARY_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@.+@@$").expect("Invalid regex pattern"));

/// Snapshot of the variables visible to one step invocation
#[derive(Debug, Clone, Default)]
pub struct BuildEnvironment {
    vars: HashMap<String, String>,
}

impl BuildEnvironment {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    pub fn from_process() -> Self {
        Self::new(std::env::vars().collect())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Variables whose whole name is delimited by `@@`
    pub fn data_dictionary(&self) -> DataDictionary {
        self.vars
            .iter()
            .filter(|(key, _)| DICTIONARY_KEY.is_match(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BuildEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Replaces every `${NAME}` with the variable's value.
///
/// Placeholders with no (or a blank) value stay as written and a warning is
/// printed; this never fails.
pub fn replace_placeholders(input: &str, env: &BuildEnvironment, console: &dyn Console) -> String {
    if !PLACEHOLDER.is_match(input) {
        return input.to_string();
    }

    console.println(&format!("Replacing job parameters for '{input}'"));

    let replaced = PLACEHOLDER.replace_all(input, |caps: &regex::Captures<'_>| {
        let placeholder = &caps[0];
        let name = &caps[1];
        match env.get(name).filter(|v| !v.trim().is_empty()) {
            Some(value) => {
                console.println(&format!(
                    "Retrieved value '{value}' from job parameter '{placeholder}'"
                ));
                value.to_string()
            }
            None => {
                console.println(&format!("WARNING: job parameter not found '{placeholder}'"));
                tracing::warn!(placeholder, "unresolved job parameter left in place");
                placeholder.to_string()
            }
        }
    });

    console.println(&format!("Replaced value '{replaced}'"));
    replaced.into_owned()
}
