use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::ColumnPolicy;
use crate::ensembl::{DEFAULT_DIVISION, DEFAULT_SERVER};
use crate::error::GeneModelError;

pub const DEFAULT_CONFIG_FILE: &str = "gmexport.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub export_dir: Option<String>,
    #[serde(default)]
    pub delimiter: Option<char>,
    #[serde(default)]
    pub column_policy: Option<ColumnPolicy>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server: Option<String>,
    pub cache_dir: Option<String>,
    pub export_dir: Option<String>,
    pub delimiter: Option<char>,
    pub column_policy: Option<ColumnPolicy>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub server: String,
    pub division: String,
    pub cache_dir: Utf8PathBuf,
    pub export_dir: Utf8PathBuf,
    pub delimiter: u8,
    pub column_policy: ColumnPolicy,
    pub timeout: Option<Duration>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, GeneModelError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| GeneModelError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| GeneModelError::ConfigParse(err.to_string()))?
        };

        let cwd = std::env::current_dir()
            .map_err(|err| GeneModelError::Filesystem(err.to_string()))?;
        let cwd = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| GeneModelError::Filesystem("invalid working directory".to_string()))?;

        Self::resolve_config(config, overrides, &cwd)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
        cwd: &Utf8Path,
    ) -> Result<ResolvedConfig, GeneModelError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let delimiter = overrides.delimiter.or(config.delimiter).unwrap_or(',');
        if !delimiter.is_ascii() || matches!(delimiter, '\n' | '\r' | '"') {
            return Err(GeneModelError::ConfigParse(format!(
                "delimiter must be a single ASCII character other than a quote or newline, got {delimiter:?}"
            )));
        }

        let cache_dir = overrides
            .cache_dir
            .or(config.cache_dir)
            .map(|dir| cwd.join(dir))
            .unwrap_or_else(|| cwd.join(".gmexport"));
        let export_dir = overrides
            .export_dir
            .or(config.export_dir)
            .map(|dir| cwd.join(dir))
            .unwrap_or_else(|| cwd.to_path_buf());

        Ok(ResolvedConfig {
            schema_version,
            server: overrides
                .server
                .or(config.server)
                .unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            division: config
                .division
                .unwrap_or_else(|| DEFAULT_DIVISION.to_string()),
            cache_dir,
            export_dir,
            delimiter: delimiter as u8,
            column_policy: overrides
                .column_policy
                .or(config.column_policy)
                .unwrap_or_default(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_without_config() {
        let cwd = Utf8PathBuf::from("/work");
        let resolved =
            ConfigLoader::resolve_config(Config::default(), ConfigOverrides::default(), &cwd)
                .unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.server, DEFAULT_SERVER);
        assert_eq!(resolved.division, "EnsemblPlants");
        assert_eq!(resolved.cache_dir, Utf8PathBuf::from("/work/.gmexport"));
        assert_eq!(resolved.export_dir, cwd);
        assert_eq!(resolved.delimiter, b',');
        assert_eq!(resolved.column_policy, ColumnPolicy::FirstRecord);
        assert_eq!(resolved.timeout, None);
    }

    #[test]
    fn rejects_multibyte_delimiter() {
        let overrides = ConfigOverrides {
            delimiter: Some('§'),
            ..ConfigOverrides::default()
        };
        let err = ConfigLoader::resolve_config(
            Config::default(),
            overrides,
            &Utf8PathBuf::from("/work"),
        )
        .unwrap_err();
        assert_matches!(err, GeneModelError::ConfigParse(_));
    }
}
