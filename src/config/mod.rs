//! Configuration for a warehouse run.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, WarehouseError};

/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "WAREHOUSE_CONFIG";

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "warehouse.toml";

/// Default number of rows per record batch when reading delimited text
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Helper function to get batch size from environment
#[must_use]
pub fn get_batch_size() -> Option<usize> {
    std::env::var("WAREHOUSE_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
}

/// Configuration for a full warehouse build
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Directory holding the raw sources
    pub input_root: PathBuf,
    /// Directory receiving one sub-directory per table
    pub output_root: PathBuf,
    /// Source file names, relative to `input_root`
    pub sources: SourcePaths,
    /// Object storage credentials
    pub credentials: Option<Credentials>,
    /// Worker threads for the session pool, defaults to the CPU count
    pub threads: Option<usize>,
    /// Rows per batch when reading delimited text
    pub batch_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("./data"),
            output_root: PathBuf::from("./tables"),
            sources: SourcePaths::default(),
            credentials: None,
            threads: None,
            batch_size: get_batch_size().unwrap_or(DEFAULT_BATCH_SIZE),
        }
    }
}

/// Locations of the four raw sources
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcePaths {
    pub temperature: PathBuf,
    pub demographics: PathBuf,
    pub immigration: PathBuf,
    pub labels: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            temperature: PathBuf::from("GlobalLandTemperaturesByCity.csv"),
            demographics: PathBuf::from("us-cities-demographics.csv"),
            immigration: PathBuf::from("sas_data"),
            labels: PathBuf::from("I94_SAS_Labels_Descriptions.SAS"),
        }
    }
}

/// Access key pair for remote object storage
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &"<redacted>")
            .finish()
    }
}

impl WarehouseConfig {
    /// Configuration rooted at the given input and output directories
    #[must_use]
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            WarehouseError::Config(format!("Cannot read {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from `WAREHOUSE_CONFIG`, `./warehouse.toml`, or defaults
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::from_file(Path::new(&path));
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            Self::from_file(local)
        } else {
            log::info!("No {DEFAULT_CONFIG_FILE} found, using default configuration");
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(WarehouseError::Config("batch_size must be positive".to_string()));
        }
        if self.threads == Some(0) {
            return Err(WarehouseError::Config("threads must be positive".to_string()));
        }
        Ok(())
    }

    /// Temperature CSV path
    #[must_use]
    pub fn temperature_path(&self) -> PathBuf {
        self.input_root.join(&self.sources.temperature)
    }

    /// Demographics CSV path
    #[must_use]
    pub fn demographics_path(&self) -> PathBuf {
        self.input_root.join(&self.sources.demographics)
    }

    /// Immigration records path (Parquet directory or CSV)
    #[must_use]
    pub fn immigration_path(&self) -> PathBuf {
        self.input_root.join(&self.sources.immigration)
    }

    /// Label descriptions path
    #[must_use]
    pub fn labels_path(&self) -> PathBuf {
        self.input_root.join(&self.sources.labels)
    }
}
