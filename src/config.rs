// Tutor Configuration
//
// Ranking coefficients, selection weights, calibration parameters and
// storage locations. Loaded from an optional TOML file with GEOTUTOR__*
// environment overrides (e.g. GEOTUTOR__RANKING__THRESHOLD=0.05).

use crate::engine::{RankingWeights, SelectionWeights, DEFAULT_THRESHOLD};
use crate::error::{Result, TutorError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "GEOTUTOR";

/// Main tutor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    /// Theorem ranking
    pub ranking: RankingConfig,

    /// Next-question score coefficients
    pub selection: SelectionWeights,

    /// Offline calibration jobs
    pub calibration: CalibrationConfig,

    /// Database locations
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Coefficient of the triangle-compatibility score
    pub triangle: f64,

    /// Coefficient of the answer-specific theorem score
    pub specific: f64,

    /// Coefficient of general helpfulness
    pub general: f64,

    /// Theorems scoring below this are not returned
    pub threshold: f64,
}

impl RankingConfig {
    pub fn weights(&self) -> RankingWeights {
        RankingWeights {
            triangle: self.triangle,
            specific: self.specific,
            general: self.general,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        let weights = RankingWeights::default();
        Self {
            triangle: weights.triangle,
            specific: weights.specific,
            general: weights.general,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Step size toward the empirical target
    pub alpha: f64,

    /// Scale applied to the empirical rate before clamping
    pub scale: f64,

    /// Minimum observations of a (question, answer) before its multipliers move
    pub min_observations: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            alpha: 0.25,
            scale: 1.5,
            min_observations: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub knowledge_db: PathBuf,
    pub sessions_db: PathBuf,
    pub pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_data_dir();
        Self {
            knowledge_db: dir.join("knowledge.db"),
            sessions_db: dir.join("sessions.db"),
            pool_size: crate::storage::DEFAULT_POOL_SIZE,
        }
    }
}

/// `<data dir>/geotutor`, falling back to the working directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("geotutor"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `<config dir>/geotutor/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("geotutor").join("config.toml"))
}

impl TutorConfig {
    /// Layer defaults, the optional file and environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        let file = path.map(Path::to_path_buf).or_else(default_config_path);
        if let Some(file) = &file {
            debug!("Reading configuration from {}", file.display());
            builder = builder.add_source(
                config::File::from(file.as_path())
                    .format(config::FileFormat::Toml)
                    // an explicitly given file must exist
                    .required(path.is_some()),
            );
        }

        let config: TutorConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: TutorConfig = toml::from_str(toml_str)
            .map_err(|e| invalid(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| invalid(e.to_string()))
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let ranking = &self.ranking;
        for (name, value) in [
            ("ranking.triangle", ranking.triangle),
            ("ranking.specific", ranking.specific),
            ("ranking.general", ranking.general),
            ("selection.information_gain", self.selection.information_gain),
            ("selection.relevance", self.selection.relevance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "{} must be finite and non-negative",
                    name
                )));
            }
        }

        if !self.ranking.threshold.is_finite() {
            return Err(invalid("ranking.threshold must be finite".to_string()));
        }

        let calibration = &self.calibration;
        if !(calibration.alpha > 0.0 && calibration.alpha <= 1.0) {
            return Err(invalid(
                "calibration.alpha must be within (0, 1]".to_string(),
            ));
        }
        if !calibration.scale.is_finite() || calibration.scale <= 0.0 {
            return Err(invalid("calibration.scale must be positive".to_string()));
        }
        if calibration.min_observations == 0 {
            return Err(invalid(
                "calibration.min_observations must be at least 1".to_string(),
            ));
        }

        if self.storage.pool_size == 0 || self.storage.pool_size > 64 {
            return Err(invalid(
                "storage.pool_size must be between 1 and 64".to_string(),
            ));
        }

        Ok(())
    }
}

fn invalid(message: String) -> TutorError {
    TutorError::Config(config::ConfigError::Message(message))
}
