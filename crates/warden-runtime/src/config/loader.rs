//! Layered configuration loading.
//!
//! Sources are merged lowest to highest:
//!
//! 1. `WardenConfig::default()`
//! 2. configs passed to [`ConfigLoader::merge`]
//! 3. `warden.{profile}.toml` / `.yaml` next to the main file
//! 4. the main file: `warden.toml`, `warden.yaml` or `warden.yml`
//! 5. `WARDEN_*` environment variables, `__` separating nested keys
//!
//! `WARDEN_DISPATCH__MAX_CONCURRENT_EVENTS=16` sets
//! `dispatch.max_concurrent_events`. The profile is read from
//! `WARDEN_PROFILE` and defaults to `development`.
//!
//! File formats are feature-gated: `toml-config` and `yaml-config`. A file
//! whose format is disabled is never searched for, and naming one explicitly
//! is an error.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./deploy/warden.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info};

use super::error::{ConfigError, ConfigResult};
use super::schema::WardenConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "WARDEN_";
const PROFILE_VAR: &str = "WARDEN_PROFILE";
const DEFAULT_PROFILE: &str = "development";

/// Main file names, searched in this order within each directory.
const CANDIDATES: &[&str] = &["warden.toml", "warden.yaml", "warden.yml"];

/// Merges `path` into `figment` if its extension names an enabled format.
fn merge_file(figment: Figment, path: &Path) -> Option<Figment> {
    match path.extension().and_then(|e| e.to_str())? {
        #[cfg(feature = "toml-config")]
        "toml" => Some(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Some(figment.merge(Yaml::file(path))),
        _ => {
            let _ = figment;
            None
        }
    }
}

/// `warden.toml` with profile `prod` becomes `warden.prod.toml`.
fn profile_variant(path: &Path, profile: &str) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    Some(path.with_file_name(format!("{stem}.{profile}.{ext}")))
}

/// Figment-backed loader for [`WardenConfig`].
pub struct ConfigLoader {
    merged: Figment,
    profile: String,
    search_paths: Vec<PathBuf>,
    file: Option<PathBuf>,
    load_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            merged: Figment::new(),
            profile: std::env::var(PROFILE_VAR)
                .map(|profile| profile.to_lowercase())
                .unwrap_or_else(|_| DEFAULT_PROFILE.to_string()),
            search_paths: Vec::new(),
            file: None,
            load_env: true,
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into().to_lowercase();
        self
    }

    pub fn current_profile(&self) -> &str {
        &self.profile
    }

    /// Adds a directory to search for `warden.*`.
    ///
    /// Without any search path, the current directory and then the user
    /// config directory (`~/.config/warden` on Linux) are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Layers `config` over the defaults, below every file and the environment.
    pub fn merge(mut self, config: WardenConfig) -> Self {
        self.merged = self.merged.merge(Serialized::defaults(config));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<WardenConfig> {
        let figment = self.figment()?;
        let config: WardenConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;
        validate_config(&config)?;

        debug!(
            profile = %self.profile,
            logging_level = %config.logging.level,
            max_concurrent_events = config.dispatch.max_concurrent_events,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(WardenConfig::default()))
            .merge(self.merged.clone());

        let main = match &self.file {
            Some(path) if !path.exists() => return Err(ConfigError::FileNotFound(path.clone())),
            Some(path) => Some(path.clone()),
            None => self.find_main_file(),
        };

        match main {
            Some(path) => {
                if let Some(variant) = profile_variant(&path, &self.profile)
                    .filter(|variant| variant.exists())
                {
                    debug!(path = %variant.display(), "Loading profile configuration");
                    figment = merge_file(figment, &variant).ok_or_else(|| unsupported(&variant))?;
                }
                info!(path = %path.display(), "Loading configuration file");
                figment = merge_file(figment, &path).ok_or_else(|| unsupported(&path))?;
            }
            None => debug!("No configuration file found, using defaults"),
        }

        if self.load_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }
        Ok(figment)
    }

    /// Returns the first existing candidate whose format is enabled.
    fn find_main_file(&self) -> Option<PathBuf> {
        let defaults;
        let roots = if self.search_paths.is_empty() {
            defaults = std::env::current_dir()
                .ok()
                .into_iter()
                .chain(dirs::config_dir().map(|dir| dir.join("warden")))
                .collect::<Vec<_>>();
            &defaults
        } else {
            &self.search_paths
        };

        roots
            .iter()
            .flat_map(|dir| CANDIDATES.iter().map(move |name| dir.join(name)))
            .find(|path| path.exists() && merge_file(Figment::new(), path).is_some())
    }
}

fn unsupported(path: &Path) -> ConfigError {
    ConfigError::ParseError(format!(
        "Unsupported or disabled configuration file format: {}",
        path.display()
    ))
}
