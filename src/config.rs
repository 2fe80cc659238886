use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::source::BackendKind;

const ENV_DATA_DIR: &str = "OPENCLAW_DIR";
const ENV_STORE_ENABLED: &str = "USAGE_DB_ENABLED";
const ENV_STORE_PATH: &str = "USAGE_DB_PATH";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) data_dir: Option<PathBuf>,
    #[serde(default)]
    pub(crate) store_path: Option<PathBuf>,
    #[serde(default)]
    pub(crate) store_enabled: bool,
    #[serde(default)]
    pub(crate) debug: bool,
    #[serde(default)]
    pub(crate) no_color: bool,
}

/// Outcome of the config search, kept until logging is up
#[derive(Debug, Default)]
pub(crate) struct LoadedConfig {
    pub(crate) config: Config,
    pub(crate) path: Option<PathBuf>,
    pub(crate) failures: Vec<String>,
}

impl LoadedConfig {
    pub(crate) fn log(&self) {
        for failure in &self.failures {
            tracing::warn!("{failure}");
        }
        if let Some(path) = &self.path {
            tracing::debug!(path = %path.display(), "loaded config");
        }
    }
}

impl Config {
    /// First config file that parses wins; broken files are skipped
    pub(crate) fn load() -> LoadedConfig {
        Self::load_from(&Self::get_config_paths())
    }

    fn load_from(paths: &[PathBuf]) -> LoadedConfig {
        let mut loaded = LoadedConfig::default();
        for path in paths {
            if !path.exists() {
                continue;
            }
            let parsed = fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|content| toml::from_str::<Config>(&content).map_err(|e| e.to_string()));
            match parsed {
                Ok(config) => {
                    loaded.config = config;
                    loaded.path = Some(path.clone());
                    return loaded;
                }
                Err(e) => loaded
                    .failures
                    .push(format!("Failed to parse {}: {}", path.display(), e)),
            }
        }
        loaded
    }

    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("usage-report").join("config.toml"));
        }

        // macOS: ~/Library/Application Support
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("usage-report").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".usage-report.toml"));
        }

        paths
    }
}

/// Deployment-time overrides read from the environment
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct EnvOverrides {
    pub(crate) data_dir: Option<PathBuf>,
    pub(crate) store_enabled: Option<bool>,
    pub(crate) store_path: Option<PathBuf>,
}

impl EnvOverrides {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            data_dir: non_empty(ENV_DATA_DIR).map(PathBuf::from),
            store_enabled: non_empty(ENV_STORE_ENABLED).map(|v| v.trim() == "true"),
            store_path: non_empty(ENV_STORE_PATH).map(PathBuf::from),
        }
    }
}

/// Effective settings after config file, environment and flags
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub(crate) data_dir: PathBuf,
    pub(crate) store_path: Option<PathBuf>,
    pub(crate) backend: BackendKind,
}

/// Flag values that take precedence over everything else
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FlagOverrides<'a> {
    pub(crate) data_dir: Option<&'a Path>,
    pub(crate) backend: Option<BackendKind>,
}

impl Settings {
    pub(crate) fn resolve(config: &Config, env: &EnvOverrides, flags: FlagOverrides<'_>) -> Self {
        let data_dir = flags
            .data_dir
            .map(Path::to_path_buf)
            .or_else(|| env.data_dir.clone())
            .or_else(|| config.data_dir.clone())
            .unwrap_or_else(default_data_dir);

        let store_enabled = env.store_enabled.unwrap_or(config.store_enabled);
        let backend = flags.backend.unwrap_or(if store_enabled {
            BackendKind::Store
        } else {
            BackendKind::Scan
        });

        Self {
            data_dir,
            store_path: env.store_path.clone().or_else(|| config.store_path.clone()),
            backend,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".openclaw")
}
