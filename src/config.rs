use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "LDAUDIT";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub user_agent: String,
    /// Offending nodes shown per category in summaries.
    pub sample_size: usize,
    #[serde(default)]
    pub contract_path: Option<PathBuf>,
}

impl Settings {
    /// Defaults, then `ldaudit.toml` (or `file`), then `LDAUDIT_*` env vars.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("concurrency", 10_i64)?
            .set_default("timeout_secs", 20_i64)?
            .set_default("cache_ttl_secs", 300_i64)?
            .set_default("user_agent", concat!("ldaudit/", env!("CARGO_PKG_VERSION")))?
            .set_default("sample_size", 5_i64)?;

        builder = match file {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name("ldaudit").required(false)),
        };

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Message("concurrency must be greater than 0".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Message("timeout_secs must be greater than 0".into()));
        }
        if self.sample_size == 0 {
            return Err(ConfigError::Message("sample_size must be greater than 0".into()));
        }
        Ok(())
    }
}
