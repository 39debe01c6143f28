//! Service configuration from `VITALRISK_*` environment variables.
//!
//! Loading is best-effort: unset or unparsable values keep their defaults.

use std::path::PathBuf;

use crate::adapters::artifacts::{verifying_key_from_b64, ArtifactError, ArtifactLoader};
use crate::application::DEFAULT_LOOKBACK_DAYS;

pub const MODEL_DIR_ENV: &str = "VITALRISK_MODEL_DIR";
pub const DB_PATH_ENV: &str = "VITALRISK_DB_PATH";
pub const HISTORY_DAYS_ENV: &str = "VITALRISK_HISTORY_DAYS";
pub const ARTIFACT_PUBKEY_ENV: &str = "VITALRISK_ARTIFACT_PUBKEY_B64";
pub const REQUIRE_SIGNED_ENV: &str = "VITALRISK_REQUIRE_SIGNED_ARTIFACTS";
pub const LOG_MODE_ENV: &str = "VITALRISK_LOG_MODE";
pub const LOG_FILE_ENV: &str = "VITALRISK_LOG_FILE";

/// Upper bound on the history lookback (ten years).
pub const MAX_HISTORY_DAYS: u32 = 3650;

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    #[default]
    Stderr,
    File,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub model_dir: PathBuf,
    pub db_path: PathBuf,
    pub history_days: u32,
    pub artifact_pubkey_b64: Option<String>,
    pub require_signed_artifacts: bool,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            db_path: PathBuf::from("data/health_records.db"),
            history_days: DEFAULT_LOOKBACK_DAYS,
            artifact_pubkey_b64: None,
            require_signed_artifacts: false,
            log_mode: LogMode::Stderr,
            log_file: PathBuf::from("data/vitalrisk.log"),
        }
    }
}

impl ServiceConfig {
    /// Load overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load overrides from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get(MODEL_DIR_ENV) {
            cfg.model_dir = PathBuf::from(v);
        }

        if let Some(v) = get(DB_PATH_ENV) {
            cfg.db_path = PathBuf::from(v);
        }

        if let Some(v) = get(HISTORY_DAYS_ENV) {
            match v.parse::<u32>() {
                Ok(days) if (1..=MAX_HISTORY_DAYS).contains(&days) => cfg.history_days = days,
                _ => tracing::warn!("Ignoring invalid {}: {:?}", HISTORY_DAYS_ENV, v),
            }
        }

        cfg.artifact_pubkey_b64 = get(ARTIFACT_PUBKEY_ENV);

        if let Some(v) = get(REQUIRE_SIGNED_ENV) {
            cfg.require_signed_artifacts = parse_bool(&v).unwrap_or_else(|| {
                tracing::warn!("Ignoring invalid {}: {:?}", REQUIRE_SIGNED_ENV, v);
                false
            });
        }

        if let Some(v) = get(LOG_MODE_ENV) {
            cfg.log_mode = match v.to_ascii_lowercase().as_str() {
                "file" => LogMode::File,
                _ => LogMode::Stderr,
            };
        }

        if let Some(v) = get(LOG_FILE_ENV) {
            cfg.log_file = PathBuf::from(v);
        }

        cfg
    }

    /// Artifact loader honoring the integrity settings.
    ///
    /// # Errors
    /// Returns `ArtifactError::Invalid` if the configured public key is malformed.
    pub fn artifact_loader(&self) -> Result<ArtifactLoader, ArtifactError> {
        let loader = ArtifactLoader::new(&self.model_dir);
        let loader = match &self.artifact_pubkey_b64 {
            Some(b64) => loader.with_verifying_key(verifying_key_from_b64(b64)?),
            None => loader,
        };
        Ok(loader.require_signature(self.require_signed_artifacts))
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
