// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::Level;

fn default_server_port() -> u16 {
    49494
}

fn default_server_root_path() -> String {
    "/api".to_string()
}

fn default_worker_count() -> usize {
    1
}

fn default_auth_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_translator_threads() -> usize {
    1
}

fn default_language_detector_repository() -> String {
    "facebook/fasttext-language-identification".to_string()
}

fn default_access_control_allow_origin() -> String {
    "*".to_string()
}

fn default_true() -> bool {
    true
}

fn default_batch_max_size() -> usize {
    128
}

/// Preset model sizes mapping to concrete upstream repositories, matching
/// the original service's `MODEL_SIZE_PRESETS` table.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Small,
    Medium,
    #[default]
    Large,
}

impl ModelSize {
    #[must_use]
    pub fn default_repository(self) -> &'static str {
        match self {
            Self::Small => "OpenNMT/nllb-200-distilled-600M-ct2-int8",
            Self::Medium => "OpenNMT/nllb-200-distilled-1.3B-ct2-int8",
            Self::Large => "OpenNMT/nllb-200-3.3B-ct2-int8",
        }
    }
}

/// Log level for filtering messages.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Log file format options.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration for console and file output. Ambient concern, not
/// named in the external interface table, so it keeps the nested/prefixed
/// `LXB_LOG__*` environment convention rather than the flat spec fields.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct LogConfig {
    #[serde(default = "default_true")]
    pub console_enable: bool,
    #[serde(default)]
    pub file_enable: bool,
    #[serde(default)]
    pub console_level: LogLevel,
    #[serde(default)]
    pub file_level: LogLevel,
    #[serde(default = "default_log_file_path")]
    pub file_path: String,
    #[serde(default)]
    pub file_format: LogFormat,
}

fn default_log_file_path() -> String {
    "./lexibridge.log".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enable: true,
            file_enable: false,
            console_level: LogLevel::default(),
            file_level: LogLevel::Info,
            file_path: default_log_file_path(),
            file_format: LogFormat::default(),
        }
    }
}

/// Telemetry and observability configuration (OpenTelemetry OTLP export,
/// local Prometheus exposition, tokio-console).
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct TelemetryConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default)]
    pub tracing_enable: bool,
    pub otlp_endpoint: Option<String>,
    pub otlp_traces_endpoint: Option<String>,
    #[serde(default)]
    pub otlp_headers: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub tokio_console: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enable: true,
            tracing_enable: false,
            otlp_endpoint: None,
            otlp_traces_endpoint: None,
            otlp_headers: std::collections::HashMap::new(),
            tokio_console: false,
        }
    }
}

/// Consul-style service-registry self-registration. Purely optional:
/// self-registration only runs when both `http_addr` and `service_address`
/// are set.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
pub struct RegistryConfig {
    pub http_addr: Option<String>,
    pub service_address: Option<String>,
    pub service_port: Option<u16>,
    #[serde(default = "default_registry_scheme")]
    pub service_scheme: String,
    pub auth_token: Option<String>,
}

fn default_registry_scheme() -> String {
    "http".to_string()
}

/// Root configuration. Fields named in the external interface table are
/// flat and match their documented environment variable names exactly
/// (case-insensitively); ambient-only sections nest under `log`,
/// `telemetry`, and `registry` using a prefixed convention instead.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct Config {
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_server_root_path")]
    pub server_root_path: String,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_auth_token")]
    pub auth_token: String,

    #[serde(default)]
    pub model_size: ModelSize,
    pub translator_repository: Option<String>,
    #[serde(default = "default_translator_threads")]
    pub translator_threads: usize,
    #[serde(default)]
    pub use_cuda: bool,
    #[serde(default)]
    pub stub_translator: bool,
    #[serde(default = "default_batch_max_size")]
    pub translator_batch_max_size: usize,

    #[serde(default = "default_language_detector_repository")]
    pub language_detector_repository: String,
    #[serde(default)]
    pub stub_language_detector: bool,

    #[serde(default = "default_access_control_allow_origin")]
    pub access_control_allow_origin: String,
    #[serde(default = "default_true")]
    pub access_control_allow_method_get: bool,
    #[serde(default = "default_true")]
    pub access_control_allow_method_post: bool,
    #[serde(default = "default_true")]
    pub access_control_allow_method_options: bool,
    #[serde(default)]
    pub access_control_allow_method_delete: bool,
    #[serde(default)]
    pub access_control_allow_method_put: bool,
    #[serde(default)]
    pub access_control_allow_method_patch: bool,
    #[serde(default)]
    pub access_control_allow_method_head: bool,
    #[serde(default)]
    pub access_control_allow_method_trace: bool,
    #[serde(default)]
    pub access_control_allow_credentials: bool,
    pub access_control_allow_headers: Option<String>,
    pub access_control_expose_headers: Option<String>,

    #[serde(default)]
    pub huggingface_local_only: bool,

    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: default_server_port(),
            server_root_path: default_server_root_path(),
            worker_count: default_worker_count(),
            auth_token: default_auth_token(),

            model_size: ModelSize::default(),
            translator_repository: None,
            translator_threads: default_translator_threads(),
            use_cuda: false,
            stub_translator: false,
            translator_batch_max_size: default_batch_max_size(),

            language_detector_repository: default_language_detector_repository(),
            stub_language_detector: false,

            access_control_allow_origin: default_access_control_allow_origin(),
            access_control_allow_method_get: true,
            access_control_allow_method_post: true,
            access_control_allow_method_options: true,
            access_control_allow_method_delete: false,
            access_control_allow_method_put: false,
            access_control_allow_method_patch: false,
            access_control_allow_method_head: false,
            access_control_allow_method_trace: false,
            access_control_allow_credentials: false,
            access_control_allow_headers: None,
            access_control_expose_headers: None,

            huggingface_local_only: false,

            log: LogConfig::default(),
            telemetry: TelemetryConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl Config {
    /// Resolves the effective translator repository: an explicit override
    /// if set, otherwise the preset for `model_size`.
    #[must_use]
    pub fn effective_translator_repository(&self) -> &str {
        self.translator_repository
            .as_deref()
            .unwrap_or_else(|| self.model_size.default_repository())
    }
}

#[derive(Debug)]
pub struct ConfigLoadResult {
    pub config: Config,
    pub file_missing: Option<String>,
}

/// Loads configuration from defaults, an optional TOML file, and
/// environment variables. Spec-named fields are read unprefixed
/// (`SERVER_PORT`, `AUTH_TOKEN`, ...); ambient sections are read through a
/// `LXB_`-prefixed, double-underscore-nested convention
/// (`LXB_LOG__CONSOLE_ENABLE`, ...).
///
/// # Errors
///
/// Returns an error if the configuration file contains invalid TOML, or if
/// any source sets a value that fails to deserialize into [`Config`].
pub fn load(config_path: &str) -> Result<ConfigLoadResult, Box<figment::Error>> {
    let mut figment =
        Figment::new().merge(figment::providers::Serialized::defaults(Config::default()));

    let mut file_missing = None;
    if std::path::Path::new(config_path).exists() {
        figment = figment.merge(Toml::file(config_path));
    } else {
        file_missing = Some(config_path.to_string());
    }

    let config: Config = figment
        .merge(Env::raw())
        .merge(Env::prefixed("LXB_").split("__"))
        .extract()
        .map_err(Box::new)?;

    Ok(ConfigLoadResult { config, file_missing })
}

/// Generates the default configuration as a pretty-printed TOML string.
///
/// # Errors
///
/// Returns an error if the default configuration cannot be serialized,
/// which would indicate a programming error.
pub fn generate_default() -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_size_presets() {
        assert_eq!(
            ModelSize::Small.default_repository(),
            "OpenNMT/nllb-200-distilled-600M-ct2-int8"
        );
        assert_eq!(
            ModelSize::Large.default_repository(),
            "OpenNMT/nllb-200-3.3B-ct2-int8"
        );
    }

    #[test]
    fn test_effective_repository_prefers_explicit_override() {
        let mut config = Config::default();
        config.translator_repository = Some("custom/repo".to_string());
        assert_eq!(config.effective_translator_repository(), "custom/repo");
    }

    #[test]
    fn test_effective_repository_falls_back_to_preset() {
        let config = Config::default();
        assert_eq!(
            config.effective_translator_repository(),
            "OpenNMT/nllb-200-3.3B-ct2-int8"
        );
    }

    #[test]
    fn test_generate_default_round_trips_through_toml() {
        let toml_str = generate_default().unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server_port, default_server_port());
    }
}
