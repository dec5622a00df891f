use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::task::ScheduledTask;
use crate::time_unit::TimeUnit;

/// Prefix for environment overrides, e.g. `CADENCE__SCHEDULER__EXECUTION_TIMEOUT=30s`.
pub const ENV_PREFIX: &str = "CADENCE";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerSettings,
    pub logging: LoggingSettings,
    /// Seed definitions for the in-memory task store.
    pub tasks: Vec<ScheduledTask>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Upper bound per execution, e.g. `"30s"`. Unset means unbounded.
    pub execution_timeout: Option<String>,
    /// Skip a firing while the previous execution of the same task is still running.
    pub skip_overlapping: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            execution_timeout: None,
            skip_overlapping: true,
        }
    }
}

impl SchedulerSettings {
    pub fn execution_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.execution_timeout
            .as_deref()
            .map(|value| {
                TimeUnit::parse_duration(value)
                    .map(|(amount, unit)| unit.to_duration(amount))
                    .ok_or_else(|| ConfigError::InvalidDuration {
                        key: "scheduler.execution_timeout",
                        value: value.to_string(),
                    })
            })
            .transpose()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Self::from_source(File::from_str(source, FileFormat::Toml))
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        Self::from_source(File::from_str(source, FileFormat::Yaml))
    }

    fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = Config::builder().add_source(source).build()?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let app: AppConfig = config.clone().try_deserialize()?;
        // Surface a bad timeout at load time rather than at build time.
        app.scheduler.execution_timeout()?;
        Ok(app)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
}

/// Load config from a specific TOML file
pub fn load_toml_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
        .add_source(env_source())
        .build()?;
    AppConfig::from_config(&config)
}

/// Load config from a specific YAML file
pub fn load_yaml_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Yaml))
        .add_source(env_source())
        .build()?;
    AppConfig::from_config(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use rstest::rstest;

    #[test]
    fn defaults_when_sections_are_missing() {
        let config = AppConfig::from_toml_str("").unwrap();

        assert!(config.scheduler.skip_overlapping);
        assert_eq!(config.scheduler.execution_timeout().unwrap(), None);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.tasks.is_empty());
    }

    #[test]
    fn parses_settings_and_seed_tasks() {
        let config = AppConfig::from_toml_str(
            r#"
            [scheduler]
            execution_timeout = "30s"
            skip_overlapping = false

            [logging]
            level = "cadence_runtime=debug"
            format = "json"

            [[tasks]]
            id = 7
            task_name = "purge"
            cron_expression = "*/5 * * * * *"
            exec_type = "cleanup"

            [[tasks]]
            id = 8
            task_name = "report"
            cron_expression = "0 8 * * *"
            exec_type = "report"
            task_type = "daily"
            status = "disabled"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.scheduler.execution_timeout().unwrap(),
            Some(Duration::from_secs(30))
        );
        assert!(!config.scheduler.skip_overlapping);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.tasks.len(), 2);
        assert_eq!(config.tasks[0].status, TaskStatus::Enabled);
        assert_eq!(config.tasks[1].status, TaskStatus::Disabled);
        assert_eq!(config.tasks[1].task_type, "daily");
    }

    #[rstest]
    #[case("1", TaskStatus::Enabled)]
    #[case("0", TaskStatus::Disabled)]
    #[case("\"1\"", TaskStatus::Enabled)]
    #[case("\"0\"", TaskStatus::Disabled)]
    #[case("\"disabled\"", TaskStatus::Disabled)]
    fn seed_task_status_accepts_words_and_flags(
        #[case] status: &str,
        #[case] expected: TaskStatus,
    ) {
        let config = AppConfig::from_toml_str(&format!(
            r#"
            [[tasks]]
            id = 1
            task_name = "purge"
            cron_expression = "0 0 * * *"
            exec_type = "cleanup"
            status = {status}
            "#
        ))
        .unwrap();

        assert_eq!(config.tasks[0].status, expected);
    }

    #[test]
    fn rejects_malformed_timeout() {
        let err = AppConfig::from_yaml_str("scheduler:\n  execution_timeout: soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration { .. }));
    }
}
