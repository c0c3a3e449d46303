//! Configuration loading with hierarchy merging.
//!
//! Configuration is loaded from multiple sources and merged in order:
//!
//! 1. Built-in defaults
//! 2. System config: `/etc/boxform/config.toml`
//! 3. User config: `~/.config/boxform/config.toml`
//! 4. Additional config file (via `--config` flag)
//! 5. CLI flags (highest priority)

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::ConfigError;
use super::schema::Config;
use crate::cli::{Cli, Commands};

/// System-wide configuration path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/boxform/config.toml";

/// User configuration directory name.
pub const USER_CONFIG_DIR: &str = "boxform";

/// User configuration filename.
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Configuration loader with support for hierarchy merging.
pub struct ConfigLoader {
    /// Path to system-wide configuration.
    system_path: PathBuf,
    /// Path to user configuration.
    user_path: PathBuf,
}

impl ConfigLoader {
    /// Create a new ConfigLoader with default paths.
    #[must_use]
    pub fn new() -> Self {
        let user_config_dir = dirs::config_dir()
            .map(|p| p.join(USER_CONFIG_DIR))
            .unwrap_or_else(|| PathBuf::from(".config").join(USER_CONFIG_DIR));

        Self {
            system_path: PathBuf::from(SYSTEM_CONFIG_PATH),
            user_path: user_config_dir.join(USER_CONFIG_FILE),
        }
    }

    /// Create a ConfigLoader with custom paths (for testing).
    #[must_use]
    pub fn with_paths(system_path: PathBuf, user_path: PathBuf) -> Self {
        Self {
            system_path,
            user_path,
        }
    }

    /// Load, merge and validate configuration from all sources.
    ///
    /// Missing system and user files are skipped. A missing `--config` file,
    /// invalid TOML, or a value that fails validation is an error.
    pub fn load(&self, cli: &Cli) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        for (label, path) in [("system", &self.system_path), ("user", &self.user_path)] {
            match self.load_file(path)? {
                Some(layer) => {
                    config.merge(layer);
                    debug!("Loaded {} config from {:?}", label, path);
                }
                None => debug!("No {} config found at {:?}", label, path),
            }
        }

        if let Some(ref cli_config_path) = cli.config {
            match self.load_file(cli_config_path)? {
                Some(cli_config) => {
                    config.merge(cli_config);
                    debug!("Loaded additional config from {:?}", cli_config_path);
                }
                None => {
                    // Unlike system/user config, a missing CLI-specified config is an error
                    return Err(ConfigError::ReadError {
                        path: cli_config_path.clone(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "Specified config file not found",
                        ),
                    });
                }
            }
        }

        apply_cli(&mut config, &cli.command);
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, returning None if it doesn't exist.
    fn load_file(&self, path: &Path) -> Result<Option<Config>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Config =
                    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                        path: path.to_path_buf(),
                        source: e,
                    })?;
                Ok(Some(config))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_cli(config: &mut Config, command: &Commands) {
    if let Commands::Connect {
        page_url,
        path,
        auto_submit,
    } = command
    {
        if let Some(url) = page_url {
            config.server.page_url = url.clone();
        }
        if let Some(path) = path {
            config.server.path = path.clone();
        }
        if *auto_submit {
            config.form.auto_submit = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_cli() -> Cli {
        Cli {
            command: Commands::Connect {
                page_url: None,
                path: None,
                auto_submit: false,
            },
            config: None,
            verbose: 0,
        }
    }

    fn loader_in(dir: &Path) -> ConfigLoader {
        ConfigLoader::with_paths(dir.join("system.toml"), dir.join("user.toml"))
    }

    #[test]
    fn test_missing_files_use_defaults() {
        let dir = tempdir().unwrap();
        let config = loader_in(dir.path()).load(&create_test_cli()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_user_overrides_system() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("system.toml"),
            "[transport]\nmax_backoff_secs = 60\ninitial_backoff_secs = 2\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("user.toml"),
            "[transport]\nmax_backoff_secs = 30\n",
        )
        .unwrap();

        let config = loader_in(dir.path()).load(&create_test_cli()).unwrap();
        assert_eq!(config.transport.initial_backoff_secs, 2);
        assert_eq!(config.transport.max_backoff_secs, 30);
    }

    #[test]
    fn test_cli_config_file_and_flags() {
        let dir = tempdir().unwrap();
        let extra = dir.path().join("extra.toml");
        fs::write(
            &extra,
            "[server]\npage_url = \"https://file.example/\"\npath = \"/file\"\n",
        )
        .unwrap();

        let mut cli = create_test_cli();
        cli.config = Some(extra);
        cli.command = Commands::Connect {
            page_url: Some("http://flag.example:9000/".to_string()),
            path: None,
            auto_submit: true,
        };

        let config = loader_in(dir.path()).load(&cli).unwrap();
        assert_eq!(config.server.page_url, "http://flag.example:9000/");
        assert_eq!(config.server.path, "/file");
        assert!(config.form.auto_submit);
        assert_eq!(config.socket_url().unwrap(), "ws://flag.example:9000/file");
    }

    #[test]
    fn test_missing_cli_config_is_error() {
        let dir = tempdir().unwrap();
        let mut cli = create_test_cli();
        cli.config = Some(dir.path().join("nope.toml"));

        let err = loader_in(dir.path()).load(&cli).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("user.toml"), "[transport\nbroken").unwrap();

        let err = loader_in(dir.path()).load(&create_test_cli()).unwrap_err();
        match err {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("user.toml")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_value_is_error() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("user.toml"),
            "[transport]\ninitial_backoff_secs = 0\n",
        )
        .unwrap();

        let err = loader_in(dir.path()).load(&create_test_cli()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
