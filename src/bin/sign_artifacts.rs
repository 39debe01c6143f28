//! Artifact signing utility for VitalRisk model bundles.
//!
//! Writes `manifest.json` (SHA-256 of every artifact file) and `manifest.sig`
//! (Ed25519 signature over the manifest bytes) into the bundle directory, then
//! prints the base64 public key to configure as
//! `VITALRISK_ARTIFACT_PUBKEY_B64`.
//!
//! # Usage
//!
//! ```bash
//! VITALRISK_SIGNING_SEED_FILE=/run/secrets/seed.b64 sign_artifacts models/
//! ```
//!
//! The seed is a base64-encoded 32-byte Ed25519 secret. It is read from the
//! file named by `VITALRISK_SIGNING_SEED_FILE`; debug builds also accept
//! `VITALRISK_SIGNING_SEED_B64`. Seed bytes are zeroized after use.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use vitalrisk::adapters::artifacts::{ArtifactManifest, MANIFEST_FILE, SIGNATURE_FILE};

const SEED_FILE_ENV: &str = "VITALRISK_SIGNING_SEED_FILE";
const SEED_ENV_DEV: &str = "VITALRISK_SIGNING_SEED_B64";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn read_seed_b64() -> Result<Zeroizing<String>> {
    if let Ok(path) = env::var(SEED_FILE_ENV) {
        let content = Zeroizing::new(
            fs::read_to_string(path.trim()).context("Failed reading signing seed file")?,
        );
        let secret = content.trim_end_matches(['\n', '\r']).to_string();
        if secret.is_empty() {
            bail!("Empty signing seed");
        }
        return Ok(Zeroizing::new(secret));
    }

    // Dev-only fallback.
    if cfg!(debug_assertions) {
        if let Ok(v) = env::var(SEED_ENV_DEV) {
            let secret = v.trim_end_matches(['\n', '\r']).to_string();
            if secret.is_empty() {
                bail!("Empty signing seed");
            }
            return Ok(Zeroizing::new(secret));
        }
    }

    bail!("Missing signing seed. Provide {SEED_FILE_ENV} (or {SEED_ENV_DEV} in debug builds).")
}

fn read_seed() -> Result<Seed> {
    let b64 = read_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .context("Invalid base64 in signing seed")?,
    );
    if raw.len() != 32 {
        bail!(
            "Signing seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        );
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&raw);
    Ok(Seed(seed))
}

fn parse_args() -> Result<PathBuf> {
    let mut args = env::args().skip(1);
    match (args.next(), args.next()) {
        (Some(dir), None) if dir != "-h" && dir != "--help" => Ok(PathBuf::from(dir)),
        _ => bail!("Usage: sign_artifacts <model_dir>"),
    }
}

fn main() -> Result<()> {
    let model_dir = parse_args()?;
    if !model_dir.is_dir() {
        bail!("{model_dir:?} is not a directory");
    }

    let seed = read_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let manifest = ArtifactManifest::for_directory(&model_dir, chrono::Utc::now().timestamp())?;
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let sig: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, sig.to_bytes())
        .with_context(|| format!("Failed to write {sig_path:?}"))?;

    println!("Signed manifest: {manifest_path:?} ({} files)", manifest.files.len());
    println!("Wrote signature: {sig_path:?}");
    println!(
        "VITALRISK_ARTIFACT_PUBKEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );

    Ok(())
}
