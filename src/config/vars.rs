//! Environment variable interpolation for config files.
//!
//! Supports the following syntax:
//! - `$VAR` or `${VAR}` - substitute with env var value, error if missing
//! - `${VAR:-default}` - use default if VAR is unset OR empty
//! - `${VAR-default}` - use default only if VAR is unset
//! - `$$` - escape sequence for literal `$`

use std::env;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$                           # escape sequence $$
        |
        \$\{
            ([A-Za-z_][A-Za-z0-9_]*)   # variable name
            (?:
                (:?-)                  # :- or -
                ([^}]*)                # default value
            )?
        \}
        |
        \$([A-Za-z_][A-Za-z0-9_]*)     # unbraced $VAR
        ",
    )
    .expect("Invalid regex pattern")
});

/// Interpolate environment variables in the given text.
///
/// Missing-variable errors are accumulated so the user sees every problem in
/// one pass instead of fixing them one at a time.
pub fn interpolate(input: &str) -> Result<String, ConfigError> {
    let mut errors = Vec::new();

    let text = ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let full_match = caps.get(0).unwrap().as_str();

            if full_match == "$$" {
                return "$".to_string();
            }

            let var_name = caps
                .get(1)
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            let default_syntax = caps.get(2).map(|m| m.as_str());
            let default_value = caps.get(3).map(|m| m.as_str());

            match env::var(var_name) {
                Ok(value) => {
                    // A value with newlines would corrupt the surrounding YAML
                    if value.contains('\n') || value.contains('\r') {
                        errors.push(format!(
                            "environment variable '{var_name}' contains newlines, which is not allowed"
                        ));
                        return full_match.to_string();
                    }
                    if value.is_empty() && default_syntax == Some(":-") {
                        return default_value.unwrap_or("").to_string();
                    }
                    value
                }
                Err(_) => {
                    if let Some(default) = default_value {
                        default.to_string()
                    } else {
                        errors.push(format!("environment variable '{var_name}' is not set"));
                        full_match.to_string()
                    }
                }
            }
        })
        .to_string();

    if errors.is_empty() {
        Ok(text)
    } else {
        Err(ConfigError::EnvInterpolation {
            message: errors.join("\n"),
        })
    }
}
