//! Atomic persistence of model artifacts
//!
//! The artifact is written as a canonical JSON envelope carrying its own
//! BLAKE3 hash. Writes go to a temporary file in the target directory and are
//! renamed into place only after a successful fsync, so a reader never sees a
//! half-written artifact.

use crate::artifact::ModelArtifact;
use crate::errors::{PriceError, Result};
use crate::serde_canon::to_canonical_json;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Current on-disk envelope version
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: u32,
    artifact_hash: &'a str,
    artifact: &'a ModelArtifact,
}

#[derive(Deserialize)]
struct Envelope {
    format_version: u32,
    artifact_hash: String,
    artifact: ModelArtifact,
}

/// Model artifact file at a well-known path
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persist the artifact atomically and return its hash
    pub fn save(&self, artifact: &ModelArtifact) -> Result<String> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let artifact_hash = artifact.hash_hex()?;
        let json = to_canonical_json(&EnvelopeRef {
            format_version: ARTIFACT_FORMAT_VERSION,
            artifact_hash: &artifact_hash,
            artifact,
        })?;

        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| PriceError::Io(e.error))?;

        info!(path = %self.path.display(), hash = %artifact_hash, "model artifact saved");
        Ok(artifact_hash)
    }

    /// Load and verify the artifact.
    ///
    /// A missing file is `ArtifactNotFound`; anything partial, inconsistent
    /// or failing the hash check is `ArtifactCorrupt`.
    pub fn load(&self) -> Result<ModelArtifact> {
        let bytes = fs::read(&self.path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => PriceError::ArtifactNotFound(self.path.clone()),
            _ => PriceError::Io(err),
        })?;

        let envelope: Envelope = serde_json::from_slice(&bytes)
            .map_err(|e| PriceError::ArtifactCorrupt(format!("unreadable artifact: {e}")))?;

        if envelope.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(PriceError::ArtifactCorrupt(format!(
                "unsupported artifact format version {}",
                envelope.format_version
            )));
        }

        let actual_hash = envelope.artifact.hash_hex()?;
        if actual_hash != envelope.artifact_hash {
            return Err(PriceError::ArtifactCorrupt(format!(
                "hash mismatch: recorded {}, computed {}",
                envelope.artifact_hash, actual_hash
            )));
        }

        envelope
            .artifact
            .validate()
            .map_err(PriceError::ArtifactCorrupt)?;

        info!(path = %self.path.display(), hash = %actual_hash, "model artifact loaded");
        Ok(envelope.artifact)
    }
}
