//! Runtime settings resolved from `MD_PRINT_*` environment variables.
//!
//! Every override is validated on its own. A malformed value never fails
//! startup; it falls back to the built-in default for that field.

use std::{env, str::FromStr};

pub const HOST_VAR: &str = "MD_PRINT_HOST";
pub const PORT_VAR: &str = "MD_PRINT_PORT";
pub const MAX_CONTENT_LENGTH_VAR: &str = "MD_PRINT_MAX_CONTENT_LENGTH";
pub const ALLOW_HTML_VAR: &str = "MD_PRINT_ALLOW_HTML";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 54443;
const DEFAULT_MAX_CONTENT_LENGTH: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes.
    pub max_content_length: usize,
    /// Pass author-written HTML through to the sanitizer as markup instead of
    /// escaping it to text.
    pub allow_html: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            allow_html: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve settings from an arbitrary source of named overrides.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let settings = Self {
            host: lookup(HOST_VAR).unwrap_or(defaults.host),
            port: positive_override(&lookup, PORT_VAR).unwrap_or(defaults.port),
            max_content_length: positive_override(&lookup, MAX_CONTENT_LENGTH_VAR)
                .unwrap_or(defaults.max_content_length),
            allow_html: bool_override(&lookup, ALLOW_HTML_VAR).unwrap_or(defaults.allow_html),
        };

        tracing::info!(
            host = %settings.host,
            port = settings.port,
            max_content_length = settings.max_content_length,
            allow_html = settings.allow_html,
            "settings resolved"
        );

        settings
    }

    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

fn positive_override<F, T>(lookup: &F, name: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialOrd,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            tracing::warn!(var = name, value = %raw, "ignoring invalid positive integer");
            None
        }
    }
}

fn bool_override<F>(lookup: &F, name: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    let value = parse_bool(&raw);
    if value.is_none() {
        tracing::warn!(var = name, value = %raw, "ignoring unrecognized boolean");
    }
    value
}

fn parse_bool(token: &str) -> Option<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_overrides() {
        let settings = resolve(&[]);
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 54443);
        assert_eq!(settings.max_content_length, 1_000_000);
        assert!(!settings.allow_html);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn overrides_are_applied() {
        let settings = resolve(&[
            (HOST_VAR, "0.0.0.0"),
            (PORT_VAR, "9090"),
            (MAX_CONTENT_LENGTH_VAR, "2048"),
            (ALLOW_HTML_VAR, "true"),
        ]);
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 9090);
        assert_eq!(settings.max_content_length, 2048);
        assert!(settings.allow_html);
    }

    #[test]
    fn invalid_values_fall_back() {
        let settings = resolve(&[
            (PORT_VAR, "nope"),
            (MAX_CONTENT_LENGTH_VAR, "-12"),
            (ALLOW_HTML_VAR, "maybe"),
        ]);
        assert_eq!(settings.port, 54443);
        assert_eq!(settings.max_content_length, 1_000_000);
        assert!(!settings.allow_html);
    }

    #[test]
    fn zero_and_out_of_range_fall_back() {
        let settings = resolve(&[(PORT_VAR, "0"), (MAX_CONTENT_LENGTH_VAR, "0")]);
        assert_eq!(settings.port, 54443);
        assert_eq!(settings.max_content_length, 1_000_000);

        let settings = resolve(&[(PORT_VAR, "70000"), (MAX_CONTENT_LENGTH_VAR, "1.5")]);
        assert_eq!(settings.port, 54443);
        assert_eq!(settings.max_content_length, 1_000_000);
    }

    #[test]
    fn boolean_tokens() {
        for token in ["1", "true", "YES", " On "] {
            assert!(resolve(&[(ALLOW_HTML_VAR, token)]).allow_html, "{token}");
        }
        for token in ["0", "False", "no", "OFF", "", "2", "enabled"] {
            assert!(!resolve(&[(ALLOW_HTML_VAR, token)]).allow_html, "{token}");
        }
    }

    #[test]
    fn host_is_verbatim() {
        let settings = resolve(&[(HOST_VAR, "example.internal")]);
        assert_eq!(settings.host, "example.internal");
        assert_eq!(settings.bind_addr(), "example.internal:54443");
    }

    #[test]
    fn ipv6_bind_addr_is_bracketed() {
        let settings = resolve(&[(HOST_VAR, "::1"), (PORT_VAR, "8080")]);
        assert_eq!(settings.bind_addr(), "[::1]:8080");
    }
}
