//! Layered configuration
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. a TOML file (`--config`, `REPRISE_CONFIG_PATH`, or `./reprise.toml` if present)
//! 3. `REPRISE_*` environment variables, `__` separating nested keys
//!    (`REPRISE_EXECUTION__DEFAULT_PERSISTENT=false`)
//! 4. explicit overrides set on the builder (CLI flags)
//!
//! A `.env` file in the working directory is loaded before any of this.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::protocol::ProtocolDefaults;

const ENV_PREFIX: &str = "REPRISE";
const CONFIG_PATH_ENV: &str = "REPRISE_CONFIG_PATH";
const DEFAULT_CONFIG_FILE: &str = "reprise.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory backing the script store
    pub scripts_dir: PathBuf,
    /// Fallback filter when `RUST_LOG` is unset
    pub log_level: String,
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub default_session_id: String,
    pub default_persistent: bool,
    pub default_main_thread: bool,
    /// Upper bound on concurrently blocked executions
    pub max_blocking_threads: usize,
    /// Run main-thread requests on the process main thread; when false they run inline
    pub main_thread_dispatcher: bool,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load with no explicit overrides
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn protocol_defaults(&self) -> ProtocolDefaults {
        ProtocolDefaults {
            session_id: self.execution.default_session_id.clone(),
            persistent: self.execution.default_persistent,
            main_thread: self.execution.default_main_thread,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.execution.default_session_id.trim().is_empty() {
            bail!("execution.default_session_id must not be empty");
        }
        if self.execution.max_blocking_threads == 0 {
            bail!("execution.max_blocking_threads must be at least 1");
        }
        if self.log_level.trim().is_empty() {
            bail!("log_level must not be empty");
        }
        Ok(())
    }
}

/// `<data dir>/reprise/scripts`, or `./scripts` when there is no data dir
pub fn default_scripts_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("reprise").join("scripts"))
        .unwrap_or_else(|| PathBuf::from("scripts"))
}

#[derive(Debug, Default, Clone)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    scripts_dir: Option<PathBuf>,
    log_level: Option<String>,
    skip_env: bool,
}

impl ConfigBuilder {
    /// Config file to read (overrides default search)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn scripts_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.scripts_dir = dir;
        self
    }

    pub fn log_level(mut self, level: Option<String>) -> Self {
        self.log_level = level;
        self
    }

    /// Ignore `.env` and `REPRISE_*` variables
    pub fn skip_env(mut self, skip: bool) -> Self {
        self.skip_env = skip;
        self
    }

    pub fn build(self) -> Result<Config> {
        if !self.skip_env {
            // A missing .env is fine
            let _ = dotenvy::dotenv();
        }

        let mut builder = config::Config::builder()
            .set_default("scripts_dir", default_scripts_dir().to_string_lossy().into_owned())?
            .set_default("log_level", "info")?
            .set_default("execution.default_session_id", "default")?
            .set_default("execution.default_persistent", true)?
            .set_default("execution.default_main_thread", false)?
            .set_default("execution.max_blocking_threads", 64_i64)?
            .set_default("execution.main_thread_dispatcher", true)?;

        let env_path = if self.skip_env {
            None
        } else {
            std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
        };
        match self.config_path.or(env_path) {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                builder = builder.add_source(toml_file(&path).required(true));
            }
            None => {
                builder = builder.add_source(toml_file(Path::new(DEFAULT_CONFIG_FILE)).required(false));
            }
        }

        if !self.skip_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        if let Some(dir) = self.scripts_dir {
            builder = builder.set_override("scripts_dir", dir.to_string_lossy().into_owned())?;
        }
        if let Some(level) = self.log_level {
            builder = builder.set_override("log_level", level)?;
        }

        let config: Config = builder
            .build()
            .context("Failed to assemble configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }
}

fn toml_file(path: &Path) -> File<config::FileSourceFile, FileFormat> {
    File::from(path).format(FileFormat::Toml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::builder().skip_env(true).build().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.execution.default_session_id, "default");
        assert!(config.execution.default_persistent);
        assert!(!config.execution.default_main_thread);
        assert_eq!(config.execution.max_blocking_threads, 64);
        assert!(config.execution.main_thread_dispatcher);
        assert_eq!(config.protocol_defaults(), ProtocolDefaults::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_toml(
            r#"
log_level = "debug"
scripts_dir = "/srv/reprise/scripts"

[execution]
default_session_id = "main"
default_persistent = false
"#,
        );
        let config = Config::builder()
            .skip_env(true)
            .config_path(Some(file.path().to_path_buf()))
            .build()
            .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.scripts_dir, PathBuf::from("/srv/reprise/scripts"));
        assert_eq!(config.execution.default_session_id, "main");
        assert!(!config.execution.default_persistent);
        // Untouched keys keep their defaults
        assert_eq!(config.execution.max_blocking_threads, 64);
    }

    #[test]
    fn test_builder_overrides_win() {
        let file = write_toml("log_level = \"debug\"\n");
        let config = Config::builder()
            .skip_env(true)
            .config_path(Some(file.path().to_path_buf()))
            .log_level(Some("warn".to_string()))
            .scripts_dir(Some(PathBuf::from("elsewhere")))
            .build()
            .unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.scripts_dir, PathBuf::from("elsewhere"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = Config::builder()
            .skip_env(true)
            .config_path(Some(PathBuf::from("/definitely/not/here.toml")))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = write_toml("[execution]\nmax_blocking_threads = 0\n");
        let err = Config::builder()
            .skip_env(true)
            .config_path(Some(file.path().to_path_buf()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_blocking_threads"));
    }
}
