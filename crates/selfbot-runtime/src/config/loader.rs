//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML configuration files (`selfbot.toml`, `config.toml`)
//! - `yaml-config`: enables YAML configuration files (`selfbot.yaml`, `selfbot.yml`, etc.)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Main config file (`selfbot.toml` / `selfbot.yaml`)
//! 3. Profile-specific config file next to it (`selfbot.{profile}.toml`)
//! 4. Environment variables (`SELFBOT_*`)
//! 5. Programmatic overrides ([`ConfigLoader::set`], [`ConfigLoader::merge`])
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `SELFBOT_` prefix with `__` as separator:
//!
//! - `SELFBOT_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `SELFBOT_RATE_LIMIT__MAX_INVOCATIONS=3` → `rate_limit.max_invocations = 3`
//! - `SELFBOT_CLIENT__TOKEN=xxx` → `client.token = "xxx"`
//!
//! # Example
//!
//! ```rust,ignore
//! use selfbot_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .set("dispatch.workers", 8)
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::providers::{Env, Serialized};
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::{Figment, Provider};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::RuntimeConfig;

const ENV_PREFIX: &str = "SELFBOT_";
const PROFILE_VAR: &str = "SELFBOT_PROFILE";
const CONFIG_DIR_NAME: &str = "selfbot";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `prod` and `dev` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `SELFBOT_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Programmatic overrides, merged last.
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    ///
    /// When none are given, the current directory and the user config
    /// directory (`~/.config/selfbot` on Linux) are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Overrides a single key, e.g. `set("dispatch.workers", 8)`.
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Merges an arbitrary figment provider on top of every other source.
    pub fn merge(mut self, provider: impl Provider) -> Self {
        self.overrides = self.overrides.merge(provider);
        self
    }

    pub fn load(self) -> ConfigResult<RuntimeConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: RuntimeConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            commands = config.commands.len(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(RuntimeConfig::default()));

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;

            if let Some(profile_path) = profile_variant(&path, self.profile.as_str())
                && profile_path.exists()
            {
                debug!(path = %profile_path.display(), "Loading profile-specific config");
                figment = Self::merge_config_file(figment, &profile_path)?;
            }
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    /// Merges a single config file, dispatching on its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }

        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(CONFIG_DIR_NAME));
        }
        paths
    }

    /// Searches `search_paths × base_names` for the first base file, then
    /// layers the profile variant found next to it.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let base_path = search_path.join(base_name);
                if !base_path.exists() {
                    continue;
                }

                info!(path = %base_path.display(), "Loading configuration file");
                figment = merge_fn(figment, &base_path);

                if let Some(profile_path) = profile_variant(&base_path, self.profile.as_str())
                    && profile_path.exists()
                {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }
                return (figment, true);
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["selfbot.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["selfbot.yaml", "selfbot.yml", "config.yaml", "config.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }
}

/// `dir/selfbot.toml` → `dir/selfbot.{profile}.toml`.
fn profile_variant(path: &Path, profile: &str) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    Some(path.with_file_name(format!("{stem}.{profile}.{ext}")))
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<RuntimeConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path`, still honouring `SELFBOT_*` variables.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<RuntimeConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use figment::Jail;
    use selfbot_framework::ReplyMode;

    fn load(loader: ConfigLoader) -> Result<RuntimeConfig, figment::Error> {
        loader.load().map_err(|e| e.to_string().into())
    }

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = load(ConfigLoader::new().without_env().search_path(jail.directory()))?;
            assert_eq!(config, RuntimeConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_profile_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env(PROFILE_VAR, "prod");
            assert_eq!(Profile::from_env(), Profile::Production);

            jail.set_env(PROFILE_VAR, "Staging");
            assert_eq!(Profile::from_env(), Profile::Custom("staging".into()));
            Ok(())
        });
    }

    #[test]
    fn test_file_env_and_overrides_layer_in_order() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "selfbot.toml",
                r#"
                    [logging]
                    level = "debug"

                    [rate_limit]
                    max_invocations = 3
                    window_ms = 2000

                    [dispatch]
                    reply_mode = "send"

                    [commands.ping]
                    aliases = [".p"]
                "#,
            )?;
            jail.set_env("SELFBOT_RATE_LIMIT__WINDOW_MS", "4000");
            jail.set_env("SELFBOT_CLIENT__TOKEN", "from-env");

            let config = load(
                ConfigLoader::new()
                    .search_path(jail.directory())
                    .set("dispatch.workers", 8),
            )?;

            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.rate_limit.max_invocations, 3);
            assert_eq!(config.rate_limit.window_ms, 4000);
            assert_eq!(config.rate_limit.idle_evict_ms, 600_000);
            assert_eq!(config.dispatch.reply_mode, ReplyMode::Send);
            assert_eq!(config.dispatch.workers, 8);
            assert_eq!(config.commands["ping"].aliases, vec![".p".to_string()]);
            assert_eq!(
                config.client.token.as_ref().map(|t| t.expose()),
                Some("from-env")
            );
            Ok(())
        });
    }

    #[test]
    fn test_profile_file_overrides_base() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[dispatch]\nworkers = 2\nqueue_capacity = 16")?;
            jail.create_file("config.production.toml", "[dispatch]\nworkers = 16")?;

            let config = load(
                ConfigLoader::new()
                    .without_env()
                    .profile("production")
                    .search_path(jail.directory()),
            )?;
            assert_eq!(config.dispatch.workers, 16);
            assert_eq!(config.dispatch.queue_capacity, 16);

            let config = load(
                ConfigLoader::new()
                    .without_env()
                    .profile("development")
                    .search_path(jail.directory()),
            )?;
            assert_eq!(config.dispatch.workers, 2);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[rate_limit]\nmax_invocations = 9")?;

            let config = load(ConfigLoader::new().without_env().file("custom.toml"))?;
            assert_eq!(config.rate_limit.max_invocations, 9);

            let missing = ConfigLoader::new().without_env().file("missing.toml").load();
            assert!(matches!(missing, Err(ConfigError::FileNotFound(_))));

            jail.create_file("custom.ini", "")?;
            let unsupported = ConfigLoader::new().without_env().file("custom.ini").load();
            assert!(matches!(unsupported, Err(ConfigError::ParseError(_))));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_layers_its_profile_variant() {
        Jail::expect_with(|jail| {
            jail.create_file("bot.toml", "[dispatch]\nworkers = 2\nqueue_capacity = 16")?;
            jail.create_file("bot.production.toml", "[dispatch]\nworkers = 16")?;

            let config = load(
                ConfigLoader::new()
                    .without_env()
                    .profile("production")
                    .file("bot.toml"),
            )?;
            assert_eq!(config.dispatch.workers, 16);
            assert_eq!(config.dispatch.queue_capacity, 16);

            let config = load(
                ConfigLoader::new()
                    .without_env()
                    .profile("development")
                    .file("bot.toml"),
            )?;
            assert_eq!(config.dispatch.workers, 2);
            Ok(())
        });
    }

    #[test]
    fn test_profile_variant_path() {
        assert_eq!(
            profile_variant(Path::new("conf/bot.toml"), "production"),
            Some(PathBuf::from("conf/bot.production.toml"))
        );
        assert_eq!(profile_variant(Path::new("bot"), "production"), None);
    }

    #[test]
    fn test_invalid_value_is_a_parse_error() {
        Jail::expect_with(|jail| {
            jail.create_file("selfbot.toml", "[logging]\nlevel = \"loud\"")?;

            let result = ConfigLoader::new()
                .without_env()
                .search_path(jail.directory())
                .load();
            assert!(matches!(result, Err(ConfigError::ParseError(_))));
            Ok(())
        });
    }
}
