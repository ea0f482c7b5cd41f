use std::{
    fs,
    path::PathBuf,
    sync::{LazyLock, PoisonError, RwLock},
    time::Duration,
};

use npmeta_utils::{
    path::{resolve_path, xdg_config_home, xdg_data_home},
    time::parse_duration,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, Result};

pub const DEFAULT_PARALLEL_LIMIT: u32 = 4;
pub const DEFAULT_INGEST_TIMEOUT: &str = "5m";
pub const DEFAULT_MAX_TARBALL_SIZE: u64 = 256 * 1024 * 1024;
pub const DEFAULT_MAX_MANIFEST_SIZE: u64 = 4 * 1024 * 1024;

/// Indexer configuration
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Directory holding one JSON document per package.
    /// Default: $NPMETA_ROOT/packages
    pub store_path: Option<String>,

    /// Directory that relative tarball keys are resolved against.
    /// Default: $NPMETA_ROOT/tarballs
    pub tarball_path: Option<String>,

    /// Maximum number of ingestions running at once in a batch.
    /// Default: 4
    pub parallel_limit: Option<u32>,

    /// Upper bound on a single ingestion, covering fetch, lock wait and store
    /// access. Accepts `30s`, `5m`, `1h` style values, or `never`.
    /// Default: 5m
    pub ingest_timeout: Option<String>,

    /// Largest tarball body accepted from a remote locator, in bytes.
    /// Default: 256 MiB
    pub max_tarball_size: Option<u64>,

    /// Largest `package.json` accepted from a tarball, in bytes.
    /// Default: 4 MiB
    pub max_manifest_size: Option<u64>,

    /// Whether ingesting a version that already exists replaces it.
    /// When false, such ingestions are rejected.
    /// Default: true
    pub allow_republish: Option<bool>,

    /// User agent sent with remote tarball requests.
    /// Default: npmeta/<version>
    pub user_agent: Option<String>,
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("NPMETA_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("npmeta").join("config.toml"),
    })
});

pub fn config_path() -> PathBuf {
    CONFIG_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn set_config_path(path: PathBuf) {
    *CONFIG_PATH.write().unwrap_or_else(PoisonError::into_inner) = path;
}

/// Loads the configuration file and installs it as the global config.
pub fn init() -> Result<()> {
    let config = Config::new()?;
    *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = Some(config);
    Ok(())
}

/// Returns the global config, falling back to defaults if [`init`] was never
/// called.
pub fn get_config() -> Config {
    let mut guard = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    guard.get_or_insert_with(Config::default_config).clone()
}

fn npmeta_root() -> String {
    std::env::var("NPMETA_ROOT")
        .unwrap_or_else(|_| format!("{}/npmeta", xdg_data_home().display()))
}

impl Config {
    pub fn default_config() -> Self {
        let root = npmeta_root();

        Self {
            store_path: Some(format!("{root}/packages")),
            tarball_path: Some(format!("{root}/tarballs")),
            parallel_limit: Some(DEFAULT_PARALLEL_LIMIT),
            ingest_timeout: Some(DEFAULT_INGEST_TIMEOUT.to_string()),
            max_tarball_size: Some(DEFAULT_MAX_TARBALL_SIZE),
            max_manifest_size: Some(DEFAULT_MAX_MANIFEST_SIZE),
            allow_republish: Some(true),
            user_agent: Some(default_user_agent()),
        }
    }

    /// Creates a new configuration by loading it from the configuration file.
    /// If the configuration file is not found, it uses the default configuration.
    pub fn new() -> Result<Self> {
        let config_path = config_path();

        let mut config = match fs::read_to_string(&config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default_config(),
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Fills unset fields with defaults and validates the rest.
    pub fn resolve(&mut self) -> Result<()> {
        let root = npmeta_root();

        self.store_path
            .get_or_insert_with(|| format!("{root}/packages"));
        self.tarball_path
            .get_or_insert_with(|| format!("{root}/tarballs"));
        self.parallel_limit.get_or_insert(DEFAULT_PARALLEL_LIMIT);
        self.ingest_timeout
            .get_or_insert_with(|| DEFAULT_INGEST_TIMEOUT.to_string());
        self.max_tarball_size.get_or_insert(DEFAULT_MAX_TARBALL_SIZE);
        self.max_manifest_size
            .get_or_insert(DEFAULT_MAX_MANIFEST_SIZE);
        self.allow_republish.get_or_insert(true);
        self.user_agent.get_or_insert_with(default_user_agent);

        if self.parallel_limit == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "parallel_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_manifest_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_manifest_size",
                reason: "must be at least 1".to_string(),
            });
        }
        self.ingest_timeout()?;

        Ok(())
    }

    pub fn get_store_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("NPMETA_STORE") {
            return Ok(resolve_path(&env_path)?);
        }
        match &self.store_path {
            Some(store_path) => Ok(resolve_path(store_path)?),
            None => Ok(resolve_path(&format!("{}/packages", npmeta_root()))?),
        }
    }

    pub fn get_tarball_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("NPMETA_TARBALLS") {
            return Ok(resolve_path(&env_path)?);
        }
        match &self.tarball_path {
            Some(tarball_path) => Ok(resolve_path(tarball_path)?),
            None => Ok(resolve_path(&format!("{}/tarballs", npmeta_root()))?),
        }
    }

    /// Parsed `ingest_timeout`; `None` means ingestions are unbounded.
    pub fn ingest_timeout(&self) -> Result<Option<Duration>> {
        match self
            .ingest_timeout
            .as_deref()
            .unwrap_or(DEFAULT_INGEST_TIMEOUT)
        {
            "never" => Ok(None),
            value => {
                match parse_duration(value) {
                    Some(timeout) if timeout.is_zero() => {
                        Err(ConfigError::InvalidValue {
                            field: "ingest_timeout",
                            reason: "must be greater than zero, or `never`".to_string(),
                        })
                    }
                    Some(timeout) => Ok(Some(timeout)),
                    None => {
                        Err(ConfigError::InvalidValue {
                            field: "ingest_timeout",
                            reason: format!("`{value}` is not a duration like `30s` or `5m`"),
                        })
                    }
                }
            }
        }
    }

    pub fn parallel_limit(&self) -> usize {
        self.parallel_limit.unwrap_or(DEFAULT_PARALLEL_LIMIT).max(1) as usize
    }

    pub fn max_tarball_size(&self) -> u64 {
        self.max_tarball_size.unwrap_or(DEFAULT_MAX_TARBALL_SIZE)
    }

    pub fn max_manifest_size(&self) -> u64 {
        self.max_manifest_size.unwrap_or(DEFAULT_MAX_MANIFEST_SIZE)
    }

    pub fn allow_republish(&self) -> bool {
        self.allow_republish.unwrap_or(true)
    }
}

fn default_user_agent() -> String {
    format!("npmeta/{}", env!("CARGO_PKG_VERSION"))
}

/// Writes the default configuration to [`CONFIG_PATH`].
///
/// Refuses to overwrite an existing file.
pub fn generate_default_config() -> Result<()> {
    let config_path = config_path();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    let serialized = toml::to_string_pretty(&Config::default_config())?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, serialized)?;
    info!(
        "Default configuration file generated at: {}",
        config_path.display()
    );
    Ok(())
}
