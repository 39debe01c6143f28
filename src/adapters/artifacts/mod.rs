//! Model artifact adapter: loads the trained model bundle from disk.
//!
//! A bundle is a directory of JSON files exported by the training pipeline:
//!
//! - `feature_names.json`: ordered feature schema
//! - `scaler.json`: fitted standard scaler (`mean`, `scale`)
//! - `model.json`: fitted [`LinearSoftmaxClassifier`]
//! - `model_metadata.json`: version and model family
//!
//! # Integrity
//!
//! A bundle may carry `manifest.json`, binding every artifact file to its
//! SHA-256 digest, and `manifest.sig`, an Ed25519 signature over the manifest
//! bytes. When a verifying key is configured the signature is mandatory.
//! Without a key, a present manifest is still checked against the files.
//!
//! Every failure here is fatal: a service must not start on a partial or
//! tampered bundle.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::LinearSoftmaxClassifier;
use crate::domain::{ModelMetadata, StandardScaler};

pub const FEATURE_NAMES_FILE: &str = "feature_names.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "model.json";
pub const METADATA_FILE: &str = "model_metadata.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "manifest.sig";

/// Files a manifest must bind.
pub const ARTIFACT_FILES: [&str; 4] = [FEATURE_NAMES_FILE, SCALER_FILE, MODEL_FILE, METADATA_FILE];

const MANIFEST_VERSION: u32 = 1;

/// Error type for artifact loading.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid model artifacts: {0}")]
    Invalid(String),

    #[error("Artifact integrity check failed: {0}")]
    Integrity(String),
}

/// Signed list of artifact digests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,

    /// Unix timestamp (seconds) when the manifest was written
    pub created_at: i64,

    /// Relative file name -> lowercase hex SHA-256
    pub files: BTreeMap<String, String>,
}

impl ArtifactManifest {
    /// Hash every artifact file in `dir`.
    ///
    /// # Errors
    /// Returns `ArtifactError::Io` if any artifact file cannot be read.
    pub fn for_directory(dir: &Path, created_at: i64) -> Result<Self, ArtifactError> {
        let mut files = BTreeMap::new();
        for name in ARTIFACT_FILES {
            let path = dir.join(name);
            let bytes = fs::read(&path).map_err(|source| ArtifactError::Io { path, source })?;
            files.insert(name.to_string(), sha256_hex(&bytes));
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            created_at,
            files,
        })
    }
}

/// Everything the prediction pipeline needs from a bundle.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub classifier: LinearSoftmaxClassifier,
    pub metadata: ModelMetadata,
}

/// Loads and cross-validates a model bundle.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    dir: PathBuf,
    verifying_key: Option<VerifyingKey>,
    require_signature: bool,
}

impl ArtifactLoader {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            verifying_key: None,
            require_signature: false,
        }
    }

    /// Require `manifest.sig` to verify under `key`.
    #[must_use]
    pub fn with_verifying_key(mut self, key: VerifyingKey) -> Self {
        self.verifying_key = Some(key);
        self.require_signature = true;
        self
    }

    /// Refuse unsigned bundles even when no key is configured.
    #[must_use]
    pub fn require_signature(mut self, require: bool) -> Self {
        self.require_signature = require || self.verifying_key.is_some();
        self
    }

    /// Load the bundle.
    ///
    /// # Errors
    /// Returns error if any file is missing or malformed, if lengths disagree
    /// across files, or if the integrity check fails.
    pub fn load(&self) -> Result<ModelArtifacts, ArtifactError> {
        self.verify_integrity()?;

        let feature_names: Vec<String> = self.read_json(FEATURE_NAMES_FILE)?;
        let scaler: StandardScaler = self.read_json(SCALER_FILE)?;
        let classifier: LinearSoftmaxClassifier = self.read_json(MODEL_FILE)?;
        let metadata: ModelMetadata = self.read_json(METADATA_FILE)?;

        let n = feature_names.len();
        if n == 0 {
            return Err(ArtifactError::Invalid("feature schema is empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = feature_names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ArtifactError::Invalid(format!(
                "duplicate feature name {dup:?}"
            )));
        }
        scaler.validate(n).map_err(ArtifactError::Invalid)?;
        classifier.validate(n).map_err(ArtifactError::Invalid)?;

        tracing::info!(
            "Models loaded successfully. Best model: {} (version {}, {} features)",
            metadata.best_model,
            metadata.model_version,
            n
        );

        Ok(ModelArtifacts {
            feature_names,
            scaler,
            classifier,
            metadata,
        })
    }

    fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<T, ArtifactError> {
        let path = self.dir.join(file);
        let bytes = fs::read(&path).map_err(|source| ArtifactError::Io { path, source })?;
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
            file: file.to_string(),
            source,
        })
    }

    fn verify_integrity(&self) -> Result<(), ArtifactError> {
        let manifest_path = self.dir.join(MANIFEST_FILE);
        let sig_path = self.dir.join(SIGNATURE_FILE);

        if !manifest_path.exists() {
            if self.require_signature {
                tracing::error!("Artifact manifest not found at {:?}", manifest_path);
                return Err(ArtifactError::Integrity(
                    "signed manifest required but manifest.json is missing".into(),
                ));
            }
            tracing::warn!("Loading model artifacts without an integrity manifest");
            return Ok(());
        }

        let manifest_bytes = fs::read(&manifest_path).map_err(|source| ArtifactError::Io {
            path: manifest_path.clone(),
            source,
        })?;

        match (&self.verifying_key, sig_path.exists()) {
            (Some(key), true) => verify_signature(key, &manifest_bytes, &sig_path)?,
            (Some(_), false) => {
                return Err(ArtifactError::Integrity(
                    "manifest.sig is missing".into(),
                ))
            }
            (None, _) if self.require_signature => {
                return Err(ArtifactError::Integrity(
                    "signature required but no verifying key is configured".into(),
                ))
            }
            (None, _) => tracing::debug!("No verifying key configured; checking digests only"),
        }

        let manifest: ArtifactManifest =
            serde_json::from_slice(&manifest_bytes).map_err(|source| ArtifactError::Parse {
                file: MANIFEST_FILE.to_string(),
                source,
            })?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ArtifactError::Integrity(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }

        for name in ARTIFACT_FILES {
            let expected = manifest.files.get(name).ok_or_else(|| {
                ArtifactError::Integrity(format!("manifest does not bind {name}"))
            })?;
            let path = self.dir.join(name);
            let bytes = fs::read(&path).map_err(|source| ArtifactError::Io { path, source })?;
            if !constant_time_eq_str(&sha256_hex(&bytes), expected) {
                return Err(ArtifactError::Integrity(format!(
                    "digest mismatch for {name}"
                )));
            }
        }

        tracing::info!("Model artifact manifest verified");
        Ok(())
    }
}

fn verify_signature(
    key: &VerifyingKey,
    message: &[u8],
    sig_path: &Path,
) -> Result<(), ArtifactError> {
    let sig_bytes = fs::read(sig_path).map_err(|source| ArtifactError::Io {
        path: sig_path.to_path_buf(),
        source,
    })?;
    let sig_array: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
        ArtifactError::Integrity("invalid signature length (expected 64 bytes)".into())
    })?;
    key.verify(message, &Signature::from_bytes(&sig_array))
        .map_err(|_| ArtifactError::Integrity("invalid manifest signature".into()))
}

/// Decode a base64 Ed25519 public key.
///
/// # Errors
/// Returns `ArtifactError::Invalid` if the key is not 32 valid bytes.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ArtifactError> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| ArtifactError::Invalid(format!("invalid public key base64: {e}")))?;
    let bytes: [u8; 32] = raw
        .as_slice()
        .try_into()
        .map_err(|_| ArtifactError::Invalid("public key must be 32 bytes".into()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| ArtifactError::Invalid(format!("invalid public key: {e}")))
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// Constant-time compare for ASCII hex digests.
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |diff, (x, y)| diff | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use serde_json::json;
    use tempfile::tempdir;

    fn write_bundle(dir: &Path) {
        let files = [
            (FEATURE_NAMES_FILE, json!(["heart_rate", "glucose"])),
            (SCALER_FILE, json!({"mean": [75.0, 100.0], "scale": [12.0, 25.0]})),
            (
                MODEL_FILE,
                json!({
                    "model_type": "LogisticRegression",
                    "classes": [0, 1, 2],
                    "class_labels": ["Low", "Medium", "High"],
                    "coefficients": [[-1.0, -1.0], [0.1, 0.1], [1.0, 1.0]],
                    "intercepts": [0.5, 0.0, -0.5]
                }),
            ),
            (
                METADATA_FILE,
                json!({"model_version": "2.1.0", "best_model": "LogisticRegression"}),
            ),
        ];
        for (name, value) in files {
            fs::write(dir.join(name), serde_json::to_vec_pretty(&value).expect("json"))
                .expect("write");
        }
    }

    fn sign_bundle(dir: &Path, key: &SigningKey) {
        let manifest = ArtifactManifest::for_directory(dir, 1_700_000_000).expect("manifest");
        let bytes = serde_json::to_vec_pretty(&manifest).expect("json");
        fs::write(dir.join(MANIFEST_FILE), &bytes).expect("write manifest");
        fs::write(dir.join(SIGNATURE_FILE), key.sign(&bytes).to_bytes()).expect("write sig");
    }

    fn test_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    #[test]
    fn test_load_unsigned_bundle() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());

        let artifacts = ArtifactLoader::new(temp.path()).load().expect("Should load");
        assert_eq!(artifacts.feature_names, vec!["heart_rate", "glucose"]);
        assert_eq!(artifacts.metadata.model_version, "2.1.0");
        assert_eq!(artifacts.classifier.input_width(), 2);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        fs::remove_file(temp.path().join(SCALER_FILE)).expect("remove");

        let err = ArtifactLoader::new(temp.path()).load().expect_err("must fail");
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    #[test]
    fn test_width_mismatch_is_fatal() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        fs::write(
            temp.path().join(FEATURE_NAMES_FILE),
            br#"["heart_rate", "glucose", "age"]"#,
        )
        .expect("write");

        let err = ArtifactLoader::new(temp.path()).load().expect_err("must fail");
        assert!(matches!(err, ArtifactError::Invalid(_)));
    }

    #[test]
    fn test_duplicate_feature_names_rejected() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        fs::write(
            temp.path().join(FEATURE_NAMES_FILE),
            br#"["glucose", "glucose"]"#,
        )
        .expect("write");

        let err = ArtifactLoader::new(temp.path()).load().expect_err("must fail");
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_signed_bundle_verifies() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        let key = test_key(7);
        sign_bundle(temp.path(), &key);

        ArtifactLoader::new(temp.path())
            .with_verifying_key(key.verifying_key())
            .load()
            .expect("Should load signed bundle");
    }

    #[test]
    fn test_wrong_key_rejected() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        sign_bundle(temp.path(), &test_key(7));

        let err = ArtifactLoader::new(temp.path())
            .with_verifying_key(test_key(8).verifying_key())
            .load()
            .expect_err("must fail");
        assert!(matches!(err, ArtifactError::Integrity(_)));
    }

    #[test]
    fn test_tampered_file_rejected_even_without_key() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        sign_bundle(temp.path(), &test_key(7));
        fs::write(
            temp.path().join(SCALER_FILE),
            br#"{"mean": [0.0, 0.0], "scale": [1.0, 1.0]}"#,
        )
        .expect("write");

        let err = ArtifactLoader::new(temp.path()).load().expect_err("must fail");
        assert!(err.to_string().contains("digest mismatch"));
    }

    #[test]
    fn test_required_signature_without_manifest() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());

        let err = ArtifactLoader::new(temp.path())
            .require_signature(true)
            .load()
            .expect_err("must fail");
        assert!(matches!(err, ArtifactError::Integrity(_)));
    }

    #[test]
    fn test_verifying_key_from_b64() {
        let key = test_key(3).verifying_key();
        let b64 = base64::engine::general_purpose::STANDARD.encode(key.to_bytes());
        assert_eq!(verifying_key_from_b64(&b64).expect("decode"), key);
        assert!(verifying_key_from_b64("AAAA").is_err());
    }

    #[test]
    fn test_bundled_models_directory_loads() {
        let artifacts = ArtifactLoader::new("models").load().expect("Should load");
        assert_eq!(artifacts.feature_names.len(), 16);
        assert_eq!(
            artifacts.classifier.class_labels,
            vec!["Low", "Medium", "High"]
        );
    }
}
