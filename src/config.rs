use crate::overlay::OverlayStyle;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_log_level", deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "default_log_format", deserialize_with = "deserialize_log_format")]
    pub log_format: LogFormat,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub window: WindowConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

fn deserialize_log_format<'de, D>(deserializer: D) -> Result<LogFormat, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// When false, any completed response is parsed as a result, whatever
    /// its status code.
    #[serde(default = "default_strict_status")]
    pub strict_status: bool,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_strict_status() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
            strict_status: default_strict_status(),
        }
    }
}

impl ServerConfig {
    pub fn get_analyze_url(&self) -> String {
        format!("{}/analyze", self.base_url.trim_end_matches('/'))
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_label_offset")]
    pub label_offset: f32,
}

fn default_font_size() -> f32 {
    15.0
}

fn default_label_offset() -> f32 {
    10.0
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            label_offset: default_label_offset(),
        }
    }
}

impl OverlayConfig {
    pub fn style(&self) -> OverlayStyle {
        OverlayStyle {
            font_size: self.font_size,
            label_offset: self.label_offset,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: f32,
    #[serde(default = "default_height")]
    pub height: f32,
}

fn default_width() -> f32 {
    1200.0
}

fn default_height() -> f32 {
    800.0
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl TryFrom<String> for LogFormat {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "{} is not a supported log format. Use either `pretty` or `json`.",
                other
            )),
        }
    }
}

/// Layered configuration: `configuration/base.yaml`, then
/// `configuration/<APP_ENVIRONMENT>.yaml`, then `DV__*` variables. Every
/// layer is optional.
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no current directory: {}", e)))?;

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    load_from(&base_path.join("configuration"), &environment)
}

pub fn load_from(
    configuration_directory: &Path,
    environment: &Environment,
) -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(false))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix("DV")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    config.try_deserialize::<Config>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_dir(name: &str, files: &[(&str, &str)]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "detect-view-config-{}-{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        for (file, contents) in files {
            std::fs::write(dir.join(file), contents).unwrap();
        }
        dir
    }

    #[test]
    fn defaults_without_files() {
        let dir = config_dir("empty", &[]);
        let config = load_from(&dir, &Environment::Local).unwrap();

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.server.get_analyze_url(), "http://localhost:5000/analyze");
        assert!(config.server.strict_status);
        assert_eq!(config.server.get_timeout(), None);
        assert_eq!(config.overlay.style(), OverlayStyle::default());
    }

    #[test]
    fn environment_file_overrides_base() {
        let dir = config_dir(
            "layered",
            &[
                (
                    "base.yaml",
                    "log_level: debug\nserver:\n  base_url: http://base:1/\n  timeout_secs: 5\n",
                ),
                (
                    "production.yaml",
                    "log_format: json\nserver:\n  base_url: http://prod:2\n  strict_status: false\n",
                ),
            ],
        );
        let config = load_from(&dir, &Environment::Production).unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.server.get_analyze_url(), "http://prod:2/analyze");
        assert_eq!(config.server.get_timeout(), Some(Duration::from_secs(5)));
        assert!(!config.server.strict_status);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let dir = config_dir("bad-level", &[("base.yaml", "log_level: trace\n")]);
        assert!(load_from(&dir, &Environment::Local).is_err());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let server = ServerConfig {
            base_url: "http://host:5000/".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(server.get_analyze_url(), "http://host:5000/analyze");
    }

    #[test]
    fn environment_names() {
        assert!(matches!(
            Environment::try_from("PRODUCTION".to_string()),
            Ok(Environment::Production)
        ));
        assert!(Environment::try_from("staging".to_string()).is_err());
    }
}
