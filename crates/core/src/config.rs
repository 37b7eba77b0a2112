use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub approvals: ApprovalsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub currency: String,
    pub display_scale: u32,
    pub ingestion_mode: IngestionMode,
}

#[derive(Clone, Debug)]
pub struct ApprovalsConfig {
    pub uncovered_policy: UncoveredPolicy,
    pub escalation_role: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// How rule definitions that use unknown kinds are treated when they are loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionMode {
    /// Reject the rule set with a validation error.
    #[default]
    Strict,
    /// Keep the rule, drop the unknown action or compile the condition to never match.
    Lenient,
}

/// What a discount no approval range covers should resolve to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncoveredPolicy {
    /// Report it as uncovered and leave the decision to the caller.
    #[default]
    Unrouted,
    /// Route to `approvals.escalation_role`.
    Escalate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub currency: Option<String>,
    pub ingestion_mode: Option<IngestionMode>,
    pub uncovered_policy: Option<UncoveredPolicy>,
    pub escalation_role: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig {
                currency: "USD".to_string(),
                display_scale: 2,
                ingestion_mode: IngestionMode::Strict,
            },
            approvals: ApprovalsConfig {
                uncovered_policy: UncoveredPolicy::Unrouted,
                escalation_role: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for IngestionMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(ConfigError::Validation(format!(
                "unsupported ingestion mode `{other}` (expected strict|lenient)"
            ))),
        }
    }
}

impl std::str::FromStr for UncoveredPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unrouted" => Ok(Self::Unrouted),
            "escalate" => Ok(Self::Escalate),
            other => Err(ConfigError::Validation(format!(
                "unsupported uncovered policy `{other}` (expected unrouted|escalate)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("staffquote.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(pricing) = patch.pricing {
            if let Some(currency) = pricing.currency {
                self.pricing.currency = currency;
            }
            if let Some(display_scale) = pricing.display_scale {
                self.pricing.display_scale = display_scale;
            }
            if let Some(ingestion_mode) = pricing.ingestion_mode {
                self.pricing.ingestion_mode = ingestion_mode;
            }
        }

        if let Some(approvals) = patch.approvals {
            if let Some(uncovered_policy) = approvals.uncovered_policy {
                self.approvals.uncovered_policy = uncovered_policy;
            }
            if let Some(escalation_role) = approvals.escalation_role {
                self.approvals.escalation_role = Some(escalation_role);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("STAFFQUOTE_PRICING_CURRENCY") {
            self.pricing.currency = value;
        }
        if let Some(value) = read_env("STAFFQUOTE_PRICING_DISPLAY_SCALE") {
            self.pricing.display_scale = parse_u32("STAFFQUOTE_PRICING_DISPLAY_SCALE", &value)?;
        }
        if let Some(value) = read_env("STAFFQUOTE_PRICING_INGESTION_MODE") {
            self.pricing.ingestion_mode = value.parse()?;
        }

        if let Some(value) = read_env("STAFFQUOTE_APPROVALS_UNCOVERED_POLICY") {
            self.approvals.uncovered_policy = value.parse()?;
        }
        if let Some(value) = read_env("STAFFQUOTE_APPROVALS_ESCALATION_ROLE") {
            self.approvals.escalation_role = Some(value);
        }

        let log_level =
            read_env("STAFFQUOTE_LOGGING_LEVEL").or_else(|| read_env("STAFFQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STAFFQUOTE_LOGGING_FORMAT").or_else(|| read_env("STAFFQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(currency) = overrides.currency {
            self.pricing.currency = currency;
        }
        if let Some(ingestion_mode) = overrides.ingestion_mode {
            self.pricing.ingestion_mode = ingestion_mode;
        }
        if let Some(uncovered_policy) = overrides.uncovered_policy {
            self.approvals.uncovered_policy = uncovered_policy;
        }
        if let Some(escalation_role) = overrides.escalation_role {
            self.approvals.escalation_role = Some(escalation_role);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pricing(&self.pricing)?;
        validate_approvals(&self.approvals)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("staffquote.toml"), PathBuf::from("config/staffquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    let currency = pricing.currency.trim();
    let iso_like = currency.len() == 3 && currency.chars().all(|ch| ch.is_ascii_uppercase());
    if !iso_like {
        return Err(ConfigError::Validation(
            "pricing.currency must be a three-letter uppercase code such as `USD` or `SAR`"
                .to_string(),
        ));
    }

    if pricing.display_scale > 6 {
        return Err(ConfigError::Validation(
            "pricing.display_scale must be in range 0..=6".to_string(),
        ));
    }

    Ok(())
}

fn validate_approvals(approvals: &ApprovalsConfig) -> Result<(), ConfigError> {
    if approvals.uncovered_policy == UncoveredPolicy::Escalate {
        let missing = approvals
            .escalation_role
            .as_ref()
            .map(|value| value.trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "approvals.escalation_role is required when approvals.uncovered_policy is `escalate`"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    pricing: Option<PricingPatch>,
    approvals: Option<ApprovalsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    currency: Option<String>,
    display_scale: Option<u32>,
    ingestion_mode: Option<IngestionMode>,
}

#[derive(Debug, Default, Deserialize)]
struct ApprovalsPatch {
    uncovered_policy: Option<UncoveredPolicy>,
    escalation_role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
