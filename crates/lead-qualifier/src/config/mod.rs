use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::workflows::intake::{
    EligibilityConfig, OperationMode, ProcessorConfig, ScoringConfig, ScoringThresholds,
    ThresholdError,
};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the worker, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub pipeline: PipelineConfig,
    pub integrations: IntegrationsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            pipeline: PipelineConfig::from_env()?,
            integrations: IntegrationsConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Qualification behavior: mode, thresholds, rules, and retry cadence.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: OperationMode,
    pub default_jurisdiction: String,
    /// Directory of `<code>.json` jurisdiction files replacing the bundled data.
    pub jurisdiction_dir: Option<PathBuf>,
    pub thresholds: ScoringThresholds,
    pub eligibility: EligibilityConfig,
    pub scoring: ScoringConfig,
    pub poll_interval: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub send_decline_notices: bool,
    pub intake_recipient: Option<String>,
}

impl PipelineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mode_raw = env::var("OPERATION_MODE").unwrap_or_else(|_| "starter".to_string());
        let mode = OperationMode::parse(&mode_raw).ok_or_else(|| ConfigError::InvalidValue {
            name: "OPERATION_MODE",
            value: mode_raw.clone(),
        })?;

        let review = parse_var("REVIEW_THRESHOLD", ScoringThresholds::DEFAULT_REVIEW)?;
        let accept = parse_var("ACCEPT_THRESHOLD", ScoringThresholds::DEFAULT_ACCEPT)?;
        let thresholds = ScoringThresholds::new(review, accept).map_err(ConfigError::Thresholds)?;

        let eligibility = EligibilityConfig {
            preferred_counties: list_var("PREFERRED_COUNTIES"),
            excluded_case_types: list_var("EXCLUDED_CASE_TYPES"),
            min_sol_months_remaining: parse_var("MIN_SOL_MONTHS_REMAINING", 0)?,
        };

        let min_model_confidence = match optional_var("MIN_MODEL_CONFIDENCE") {
            Some(raw) => Some(parse_value::<u8>("MIN_MODEL_CONFIDENCE", &raw)?),
            None => None,
        };
        let default_score = parse_var("UNSCORED_DEFAULT_SCORE", 0.0_f32)?;
        if !(0.0..=100.0).contains(&default_score) {
            return Err(ConfigError::InvalidValue {
                name: "UNSCORED_DEFAULT_SCORE",
                value: default_score.to_string(),
            });
        }
        let scoring = ScoringConfig {
            default_score,
            max_description_chars: parse_var("MAX_DESCRIPTION_CHARS", 4000)?,
            min_model_confidence,
        };

        Ok(Self {
            mode,
            default_jurisdiction: env::var("DEFAULT_JURISDICTION")
                .map(|code| code.trim().to_ascii_uppercase())
                .unwrap_or_else(|_| "SC".to_string()),
            jurisdiction_dir: optional_var("JURISDICTION_DATA_DIR").map(PathBuf::from),
            thresholds,
            eligibility,
            scoring,
            poll_interval: Duration::from_secs(parse_var("POLL_INTERVAL_SECONDS", 300)?),
            max_retries: parse_var("MAX_RETRIES", 3)?,
            retry_delay: Duration::from_secs(parse_var("RETRY_DELAY_SECONDS", 30)?),
            send_decline_notices: bool_var("SEND_DECLINE_NOTICES", false)?,
            intake_recipient: optional_var("NOTIFY_RECIPIENT"),
        })
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            mode: self.mode,
            thresholds: self.thresholds,
            eligibility: self.eligibility.clone(),
            scoring: self.scoring.clone(),
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            send_decline_notices: self.send_decline_notices,
            intake_recipient: self.intake_recipient.clone(),
        }
    }
}

/// Which adapter backs each external capability.
#[derive(Debug, Clone)]
pub struct IntegrationsConfig {
    pub request_timeout: Duration,
    pub lead_store: LeadStoreBackend,
    pub completions: CompletionBackend,
    pub cases: CaseBackend,
    pub notifications: NotificationBackend,
}

impl IntegrationsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let request_timeout = Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECONDS", 30)?);

        let lead_store = match backend_var("LEAD_STORE", "memory")?.as_str() {
            "memory" => LeadStoreBackend::Memory {
                seed_csv: optional_var("LEAD_SEED_CSV").map(PathBuf::from),
            },
            "airtable" => LeadStoreBackend::Airtable(AirtableConfig {
                api_key: required_var("AIRTABLE_API_KEY")?,
                base_id: required_var("AIRTABLE_BASE_ID")?,
                table_id: required_var("AIRTABLE_TABLE_ID")?,
                api_url: optional_var("AIRTABLE_API_URL")
                    .unwrap_or_else(|| AirtableConfig::DEFAULT_API_URL.to_string()),
            }),
            other => return Err(unsupported("LEAD_STORE", other)),
        };

        let completions = match backend_var("AI_BACKEND", "offline")?.as_str() {
            "offline" => CompletionBackend::Offline,
            "openai" => CompletionBackend::OpenAi(OpenAiConfig {
                api_key: required_var("OPENAI_API_KEY")?,
                model: optional_var("OPENAI_MODEL")
                    .unwrap_or_else(|| OpenAiConfig::DEFAULT_MODEL.to_string()),
                base_url: optional_var("OPENAI_BASE_URL")
                    .unwrap_or_else(|| OpenAiConfig::DEFAULT_BASE_URL.to_string()),
                max_tokens: parse_var("OPENAI_MAX_TOKENS", 1024)?,
            }),
            other => return Err(unsupported("AI_BACKEND", other)),
        };

        let cases = match backend_var("CASE_BACKEND", "log")?.as_str() {
            "log" => CaseBackend::Log,
            "clio" => {
                let responsible_attorney_id = match optional_var("CLIO_RESPONSIBLE_ATTORNEY_ID") {
                    Some(raw) => Some(parse_value::<u64>("CLIO_RESPONSIBLE_ATTORNEY_ID", &raw)?),
                    None => None,
                };
                CaseBackend::Clio(ClioConfig {
                    access_token: required_var("CLIO_ACCESS_TOKEN")?,
                    api_url: optional_var("CLIO_API_BASE_URL")
                        .unwrap_or_else(|| ClioConfig::DEFAULT_API_URL.to_string()),
                    responsible_attorney_id,
                    matter_group_id: optional_var("CLIO_MATTER_GROUP_ID"),
                })
            }
            other => return Err(unsupported("CASE_BACKEND", other)),
        };

        let notifications = match backend_var("NOTIFY_BACKEND", "log")?.as_str() {
            "log" => NotificationBackend::Log,
            "webhook" => NotificationBackend::Webhook {
                url: required_var("NOTIFY_WEBHOOK_URL")?,
            },
            other => return Err(unsupported("NOTIFY_BACKEND", other)),
        };

        Ok(Self {
            request_timeout,
            lead_store,
            completions,
            cases,
            notifications,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadStoreBackend {
    Memory { seed_csv: Option<PathBuf> },
    Airtable(AirtableConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirtableConfig {
    pub api_key: String,
    pub base_id: String,
    pub table_id: String,
    pub api_url: String,
}

impl AirtableConfig {
    pub const DEFAULT_API_URL: &'static str = "https://api.airtable.com/v0";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionBackend {
    Offline,
    OpenAi(OpenAiConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

impl OpenAiConfig {
    pub const DEFAULT_MODEL: &'static str = "gpt-4-turbo-preview";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseBackend {
    Log,
    Clio(ClioConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClioConfig {
    pub access_token: String,
    pub api_url: String,
    pub responsible_attorney_id: Option<u64>,
    pub matter_group_id: Option<String>,
}

impl ClioConfig {
    pub const DEFAULT_API_URL: &'static str = "https://app.clio.com/api/v4";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationBackend {
    Log,
    Webhook { url: String },
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { name: &'static str, value: String },
    MissingVar(&'static str),
    Thresholds(ThresholdError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "{} has an invalid value '{}'", name, value)
            }
            ConfigError::MissingVar(name) => {
                write!(f, "{} is required by the selected integration", name)
            }
            ConfigError::Thresholds(err) => write!(f, "invalid scoring thresholds: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Thresholds(err) => Some(err),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::MissingVar(_) => None,
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    optional_var(name).ok_or(ConfigError::MissingVar(name))
}

fn parse_value<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        name,
        value: raw.to_string(),
    })
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn bool_var(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional_var(name) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { name, value: raw }),
        },
    }
}

fn list_var(name: &str) -> Vec<String> {
    optional_var(name)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn backend_var(name: &'static str, default: &str) -> Result<String, ConfigError> {
    Ok(optional_var(name)
        .unwrap_or_else(|| default.to_string())
        .to_ascii_lowercase())
}

fn unsupported(name: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    const VARS: &[&str] = &[
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "OPERATION_MODE",
        "DEFAULT_JURISDICTION",
        "JURISDICTION_DATA_DIR",
        "PREFERRED_COUNTIES",
        "EXCLUDED_CASE_TYPES",
        "MIN_SOL_MONTHS_REMAINING",
        "REVIEW_THRESHOLD",
        "ACCEPT_THRESHOLD",
        "UNSCORED_DEFAULT_SCORE",
        "MIN_MODEL_CONFIDENCE",
        "MAX_DESCRIPTION_CHARS",
        "POLL_INTERVAL_SECONDS",
        "MAX_RETRIES",
        "RETRY_DELAY_SECONDS",
        "SEND_DECLINE_NOTICES",
        "NOTIFY_RECIPIENT",
        "REQUEST_TIMEOUT_SECONDS",
        "LEAD_STORE",
        "LEAD_SEED_CSV",
        "AIRTABLE_API_KEY",
        "AIRTABLE_BASE_ID",
        "AIRTABLE_TABLE_ID",
        "AIRTABLE_API_URL",
        "AI_BACKEND",
        "OPENAI_API_KEY",
        "OPENAI_MODEL",
        "OPENAI_BASE_URL",
        "OPENAI_MAX_TOKENS",
        "CASE_BACKEND",
        "CLIO_ACCESS_TOKEN",
        "CLIO_API_BASE_URL",
        "CLIO_RESPONSIBLE_ATTORNEY_ID",
        "CLIO_MATTER_GROUP_ID",
        "NOTIFY_BACKEND",
        "NOTIFY_WEBHOOK_URL",
    ];

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in VARS {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");

        let pipeline = &config.pipeline;
        assert_eq!(pipeline.mode, OperationMode::Starter);
        assert_eq!(pipeline.default_jurisdiction, "SC");
        assert_eq!(pipeline.thresholds, ScoringThresholds::default());
        assert_eq!(pipeline.poll_interval, Duration::from_secs(300));
        assert_eq!(pipeline.max_retries, 3);
        assert_eq!(pipeline.retry_delay, Duration::from_secs(30));
        assert!(!pipeline.send_decline_notices);
        assert_eq!(pipeline.scoring.max_description_chars, 4000);

        assert_eq!(
            config.integrations.lead_store,
            LeadStoreBackend::Memory { seed_csv: None }
        );
        assert_eq!(config.integrations.completions, CompletionBackend::Offline);
        assert_eq!(config.integrations.cases, CaseBackend::Log);
        assert_eq!(config.integrations.notifications, NotificationBackend::Log);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn parses_pipeline_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("OPERATION_MODE", "PRO");
        env::set_var("REVIEW_THRESHOLD", "50");
        env::set_var("ACCEPT_THRESHOLD", "80");
        env::set_var("PREFERRED_COUNTIES", "Charleston, Berkeley ,");
        env::set_var("SEND_DECLINE_NOTICES", "yes");
        env::set_var("MIN_MODEL_CONFIDENCE", "60");

        let config = AppConfig::load().expect("config loads");
        let pipeline = config.pipeline;
        assert_eq!(pipeline.mode, OperationMode::Pro);
        assert_eq!(pipeline.thresholds.review(), 50.0);
        assert_eq!(pipeline.thresholds.accept(), 80.0);
        assert_eq!(
            pipeline.eligibility.preferred_counties,
            vec!["Charleston".to_string(), "Berkeley".to_string()]
        );
        assert!(pipeline.send_decline_notices);
        assert_eq!(pipeline.scoring.min_model_confidence, Some(60));
        reset_env();
    }

    #[test]
    fn rejects_inverted_thresholds_and_unknown_mode() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REVIEW_THRESHOLD", "90");
        env::set_var("ACCEPT_THRESHOLD", "60");
        assert!(matches!(AppConfig::load(), Err(ConfigError::Thresholds(_))));

        reset_env();
        env::set_var("OPERATION_MODE", "enterprise");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidValue {
                name: "OPERATION_MODE",
                ..
            })
        ));
        reset_env();
    }

    #[test]
    fn unscored_default_must_be_a_valid_score() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("UNSCORED_DEFAULT_SCORE", "150");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidValue {
                name: "UNSCORED_DEFAULT_SCORE",
                ..
            })
        ));

        env::set_var("UNSCORED_DEFAULT_SCORE", "NaN");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidValue {
                name: "UNSCORED_DEFAULT_SCORE",
                ..
            })
        ));

        env::set_var("UNSCORED_DEFAULT_SCORE", "40");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.pipeline.scoring.default_score, 40.0);
        reset_env();
    }

    #[test]
    fn selected_integrations_require_credentials() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LEAD_STORE", "airtable");
        env::set_var("AIRTABLE_API_KEY", "key");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MissingVar("AIRTABLE_BASE_ID"))
        ));

        reset_env();
        env::set_var("AI_BACKEND", "openai");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MissingVar("OPENAI_API_KEY"))
        ));
        reset_env();
    }
}
