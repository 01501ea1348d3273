//! `${VAR}` and `${VAR:-default}` expansion for the `[server]` table of the
//! step file, so URLs and tokens can come from the CI secret store.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InterpolationError {
    #[error("Environment variable {0} is not set and has no default")]
    Unset(String),
}

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("Invalid regex pattern")
});

/// Lookup against the process environment
pub fn from_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Single pass: defaults are used literally and values are not re-expanded.
pub fn interpolate_with<F>(input: &str, lookup: F) -> Result<String, InterpolationError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut last = 0;

    for caps in VAR_PATTERN.captures_iter(input) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = &caps[1];
        let value = match (lookup(name), caps.get(2)) {
            (Some(value), _) => value,
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => return Err(InterpolationError::Unset(name.to_string())),
        };

        out.push_str(&input[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }

    out.push_str(&input[last..]);
    Ok(out)
}

/// Expands every string inside `value`, recursing into tables and arrays
pub fn interpolate_toml<F>(value: &mut toml::Value, lookup: &F) -> Result<(), InterpolationError>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        toml::Value::String(s) => *s = interpolate_with(s, lookup)?,
        toml::Value::Array(items) => {
            for item in items {
                interpolate_toml(item, lookup)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                interpolate_toml(item, lookup)?;
            }
        }
        _ => {}
    }
    Ok(())
}
