//! Configuration loading with figment.
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. values passed to [`ConfigLoader::merge`]
//! 3. the config file: the one given to [`ConfigLoader::file`], or else the
//!    first `wabot.*` / `config.*` on the search path
//! 4. that file's profile variant (`wabot.production.toml` next to
//!    `wabot.toml`), when a profile is set
//! 5. `WABOT_*` environment variables, `__` separating nested keys
//!    (`WABOT_EXECUTION__MODE=fan-out`, `WABOT_LOGGING__LEVEL=debug`)
//!
//! TOML files need the `toml-config` feature (on by default), YAML files
//! `yaml-config`.

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::BotConfig;

const ENV_PREFIX: &str = "WABOT_";
const PROFILE_VAR: &str = "WABOT_PROFILE";
const FILE_STEMS: [&str; 2] = ["wabot", "config"];

/// Extensions tried on the search path, in order.
const EXTENSIONS: &[&str] = &[
    #[cfg(feature = "toml-config")]
    "toml",
    #[cfg(feature = "yaml-config")]
    "yaml",
    #[cfg(feature = "yaml-config")]
    "yml",
];

/// Loads a [`BotConfig`].
///
/// ```rust,ignore
/// let config = ConfigLoader::new()
///     .file("deploy/wabot.toml")
///     .profile("production")
///     .load()?;
/// ```
pub struct ConfigLoader {
    overrides: Figment,
    profile: Option<String>,
    search_paths: Vec<PathBuf>,
    file: Option<PathBuf>,
    env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Searches the current directory, then `<user config dir>/wabot`. The
    /// profile starts as `WABOT_PROFILE`, if set.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: std::env::var(PROFILE_VAR)
                .ok()
                .filter(|p| !p.is_empty())
                .map(|p| p.to_lowercase()),
            search_paths: Vec::new(),
            file: None,
            env: true,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Some(profile.as_ref().to_lowercase());
        self
    }

    /// Adds a directory to search. Once one is added the default
    /// directories are no longer searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads this file instead of searching. It must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Merges values below files and environment.
    pub fn merge(mut self, config: BotConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads the configuration. The result is not validated; see
    /// [`validate_config`](super::validate_config).
    pub fn load(self) -> ConfigResult<BotConfig> {
        let Self {
            overrides,
            profile,
            search_paths,
            file,
            env,
        } = self;

        let mut figment =
            Figment::from(Serialized::defaults(BotConfig::default())).merge(overrides);

        let path = match file {
            Some(path) if !path.exists() => return Err(ConfigError::FileNotFound(path)),
            Some(path) => Some(path),
            None => find_config_file(&search_dirs(search_paths)),
        };

        match &path {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration file");
                figment = merge_file(figment, path)?;

                if let Some(profile) = &profile
                    && let Some(variant) = profile_variant(path, profile)
                    && variant.exists()
                {
                    info!(path = %variant.display(), profile, "Loading profile configuration");
                    figment = merge_file(figment, &variant)?;
                }
            }
            None => warn!("No configuration file found, using defaults"),
        }

        if env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let config: BotConfig = figment.extract().map_err(Box::new)?;

        debug!(
            profile = profile.as_deref().unwrap_or("-"),
            phone_number_id = %config.phone_number_id,
            execution = %config.execution.mode,
            "Configuration loaded"
        );
        Ok(config)
    }
}

fn search_dirs(explicit: Vec<PathBuf>) -> Vec<PathBuf> {
    if !explicit.is_empty() {
        return explicit;
    }
    std::env::current_dir()
        .ok()
        .into_iter()
        .chain(dirs::config_dir().map(|dir| dir.join("wabot")))
        .collect()
}

fn find_config_file(search: &[PathBuf]) -> Option<PathBuf> {
    search
        .iter()
        .flat_map(|dir| {
            FILE_STEMS.iter().flat_map(move |stem| {
                EXTENSIONS
                    .iter()
                    .map(move |ext| dir.join(format!("{stem}.{ext}")))
            })
        })
        .find(|path| path.exists())
}

/// `dir/wabot.toml` with profile `production` is `dir/wabot.production.toml`.
fn profile_variant(path: &Path, profile: &str) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    Some(path.with_file_name(format!("{stem}.{profile}.{ext}")))
}

fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    match path.extension().and_then(|e| e.to_str()) {
        #[cfg(feature = "toml-config")]
        Some("toml") => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        Some("yaml" | "yml") => Ok(figment.merge(Yaml::file(path))),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DispatchSpans, ExecutionMode};
    use figment::Jail;

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level, "info");
            assert_eq!(config.logging.dispatch_spans, DispatchSpans::Off);
            assert!(config.mark_as_read);
            assert_eq!(config.execution.mode, ExecutionMode::Serial);
            assert!(config.phone_number_id.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        Jail::expect_with(|jail| {
            let missing = jail.directory().join("nope.toml");
            let result = ConfigLoader::new().file(&missing).without_env().load();
            assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("WABOT_PHONE_NUMBER_ID", "1234567890");
            jail.set_env("WABOT_EXECUTION__MODE", "fan-out");
            jail.set_env("WABOT_LOGGING__DISPATCH_SPANS", "close");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.phone_number_id, "1234567890");
            assert_eq!(config.execution.mode, ExecutionMode::FanOut);
            assert_eq!(config.logging.dispatch_spans, DispatchSpans::Close);
            Ok(())
        });
    }

    #[test]
    fn test_programmatic_merge_is_lowest() {
        Jail::expect_with(|jail| {
            jail.set_env("WABOT_MARK_AS_READ", "true");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .merge(BotConfig {
                    phone_number_id: "42".to_string(),
                    mark_as_read: false,
                    ..Default::default()
                })
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.phone_number_id, "42");
            assert!(config.mark_as_read);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_file_overrides_base() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "wabot.toml",
                r#"
                phone_number_id = 1234567890
                mark_as_read = false

                [conversation]
                end_keyword = "(?i)^quit$"

                [execution]
                mode = "serial"
                "#,
            )?;
            jail.create_file(
                "wabot.production.toml",
                r#"
                [execution]
                mode = "fan-out"
                "#,
            )?;

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .profile("Production")
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.phone_number_id, "1234567890");
            assert!(!config.mark_as_read);
            assert_eq!(config.conversation.end_keyword, "(?i)^quit$");
            assert_eq!(config.execution.mode, ExecutionMode::FanOut);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_from_env_applies_to_explicit_file() {
        Jail::expect_with(|jail| {
            jail.create_dir("deploy")?;
            jail.create_file("deploy/bot.toml", "phone_number_id = \"1\"")?;
            jail.create_file("deploy/bot.staging.toml", "phone_number_id = \"2\"")?;
            jail.set_env("WABOT_PROFILE", "staging");

            let config = ConfigLoader::new()
                .file(jail.directory().join("deploy/bot.toml"))
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.phone_number_id, "2");
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_first_search_hit_wins() {
        Jail::expect_with(|jail| {
            jail.create_dir("first")?;
            jail.create_dir("second")?;
            jail.create_file("first/config.toml", "phone_number_id = \"first\"")?;
            jail.create_file("second/wabot.toml", "phone_number_id = \"second\"")?;

            let config = ConfigLoader::new()
                .search_path(jail.directory().join("first"))
                .search_path(jail.directory().join("second"))
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.phone_number_id, "first");
            Ok(())
        });
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("wabot.ini", "phone_number_id = 1")?;
            let result = ConfigLoader::new()
                .file(jail.directory().join("wabot.ini"))
                .without_env()
                .load();
            assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
            Ok(())
        });
    }

    #[test]
    fn test_profile_variant_name() {
        assert_eq!(
            profile_variant(Path::new("conf/wabot.toml"), "production"),
            Some(PathBuf::from("conf/wabot.production.toml"))
        );
        assert_eq!(profile_variant(Path::new("wabot"), "dev"), None);
    }
}
