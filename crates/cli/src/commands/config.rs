use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;

use crate::commands::{load_config, CommandResult};

/// Effective configuration as plain text lines; failures use the JSON payload.
pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "pricing.currency",
        &config.pricing.currency,
        source("pricing.currency", &["STAFFQUOTE_PRICING_CURRENCY"]),
    ));
    lines.push(render_line(
        "pricing.display_scale",
        &config.pricing.display_scale.to_string(),
        source("pricing.display_scale", &["STAFFQUOTE_PRICING_DISPLAY_SCALE"]),
    ));
    lines.push(render_line(
        "pricing.ingestion_mode",
        &format!("{:?}", config.pricing.ingestion_mode),
        source("pricing.ingestion_mode", &["STAFFQUOTE_PRICING_INGESTION_MODE"]),
    ));

    lines.push(render_line(
        "approvals.uncovered_policy",
        &format!("{:?}", config.approvals.uncovered_policy),
        source("approvals.uncovered_policy", &["STAFFQUOTE_APPROVALS_UNCOVERED_POLICY"]),
    ));
    lines.push(render_line(
        "approvals.escalation_role",
        config.approvals.escalation_role.as_deref().unwrap_or("<unset>"),
        source("approvals.escalation_role", &["STAFFQUOTE_APPROVALS_ESCALATION_ROLE"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["STAFFQUOTE_LOGGING_LEVEL", "STAFFQUOTE_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["STAFFQUOTE_LOGGING_FORMAT", "STAFFQUOTE_LOG_FORMAT"]),
    ));

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("staffquote.toml"), PathBuf::from("config/staffquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let from_env = env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = from_env {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
