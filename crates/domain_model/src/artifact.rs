//! Versioned model artifacts and where they are stored
//!
//! An artifact bundles the network weights, the fitted preprocessor and a
//! version label. On disk each save is a generation directory of three
//! files, and a `CURRENT` pointer names the live generation:
//!
//! ```text
//! CURRENT                        "1.3-20260301T120000.000000000"
//! 1.3-20260301T120000.000000000/
//!     reimbursement_model.json   network weights
//!     preprocessor.json          fitted scaler (optional)
//!     version.txt                "major.minor"
//! ```
//!
//! A directory holding the three files directly, without a pointer, is read
//! as a single generation.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use chrono::Utc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::error::ArtifactError;
use crate::network::DualHeadModel;
use crate::preprocessor::Preprocessor;

pub const MODEL_FILE: &str = "reimbursement_model.json";
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const VERSION_FILE: &str = "version.txt";
pub const CURRENT_FILE: &str = "CURRENT";

// ============================================================================
// Version
// ============================================================================

/// Model version label, ordered numerically per component
///
/// Every checkpoint bumps the minor component: `1.0 -> 1.1 -> ... -> 1.9 -> 1.10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelVersion {
    major: u32,
    minor: u32,
}

impl ModelVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Version of the first checkpoint and of an untrained model
    pub const fn initial() -> Self {
        Self::new(1, 0)
    }

    pub fn next(self) -> Self {
        Self::new(self.major, self.minor.saturating_add(1))
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }
}

impl Default for ModelVersion {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ModelVersion {
    type Err = ArtifactError;

    /// Accepts `major.minor`, a bare major, or a float-rendered label such
    /// as `1.2000000000000002`, which is rounded to one decimal
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ArtifactError::InvalidVersion(s.to_string());
        let trimmed = s.trim();
        let (major, minor) = trimmed.split_once('.').unwrap_or((trimmed, "0"));
        let major: u32 = major.parse().map_err(|_| invalid())?;

        if minor.len() <= 4 {
            if let Ok(minor) = minor.parse::<u32>() {
                return Ok(Self::new(major, minor));
            }
        }

        let value: f64 = trimmed.parse().map_err(|_| invalid())?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }
        let tenths = (value * 10.0).round() as u64;
        let major = u32::try_from(tenths / 10).map_err(|_| invalid())?;
        Ok(Self::new(major, (tenths % 10) as u32))
    }
}

impl Serialize for ModelVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModelVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Artifact
// ============================================================================

/// Everything needed to serve predictions from one training run
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub model: DualHeadModel,
    pub preprocessor: Option<Preprocessor>,
    pub version: ModelVersion,
}

impl ModelArtifact {
    /// Seed-initialized model with no preprocessor, used when nothing is stored
    pub fn untrained(seed: u64) -> Self {
        Self {
            model: DualHeadModel::new(seed),
            preprocessor: None,
            version: ModelVersion::initial(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.preprocessor.is_some()
    }
}

/// Persistence for model artifacts
///
/// Implementations are blocking; async callers should run them on a
/// blocking thread.
pub trait ArtifactStore: Send + Sync {
    /// Loads the stored artifact, `None` when no weights have been saved
    fn load(&self) -> Result<Option<ModelArtifact>, ArtifactError>;

    /// Persists `artifact`, replacing any previous one
    fn save(&self, artifact: &ModelArtifact) -> Result<(), ArtifactError>;

    /// Version of the last saved artifact
    fn current_version(&self) -> Result<Option<ModelVersion>, ArtifactError>;
}

// ============================================================================
// File store
// ============================================================================

/// Stores artifacts as JSON files in a directory
///
/// `save` stages a complete generation, then commits it by replacing the
/// `CURRENT` pointer with one rename. A save that fails at any step leaves
/// the previously committed generation loadable.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory holding the live artifact files
    pub fn active_dir(&self) -> Result<PathBuf, ArtifactError> {
        Ok(match self.current_generation()? {
            Some(generation) => self.dir.join(generation),
            None => self.dir.clone(),
        })
    }

    fn current_generation(&self) -> Result<Option<String>, ArtifactError> {
        let path = self.dir.join(CURRENT_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ArtifactError::io(path, e)),
        };
        let name = raw.trim();
        let single_component = matches!(
            Path::new(name).components().collect::<Vec<_>>().as_slice(),
            [std::path::Component::Normal(_)]
        );
        if single_component && !name.starts_with('.') {
            Ok(Some(name.to_string()))
        } else {
            Err(ArtifactError::InvalidPointer {
                path,
                name: name.to_string(),
            })
        }
    }

    fn generation_name(&self, version: ModelVersion) -> String {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.9f");
        let base = format!("{version}-{stamp}");
        let mut name = base.clone();
        let mut n = 1;
        while self.dir.join(&name).exists() {
            name = format!("{base}-{n}");
            n += 1;
        }
        name
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: PathBuf) -> Result<Option<T>, ArtifactError> {
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ArtifactError::io(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ArtifactError::serialization(path, e))
    }

    fn read_version(dir: &Path) -> Result<Option<ModelVersion>, ArtifactError> {
        let path = dir.join(VERSION_FILE);
        match fs::read_to_string(&path) {
            Ok(raw) => raw.parse().map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ArtifactError::io(path, e)),
        }
    }

    /// Writes every file of `artifact` into the fresh directory `staging`
    fn stage(staging: &Path, artifact: &ModelArtifact) -> Result<(), ArtifactError> {
        fs::create_dir(staging).map_err(|e| ArtifactError::io(staging, e))?;

        let path = staging.join(MODEL_FILE);
        let model = serde_json::to_vec(&artifact.model).map_err(|e| ArtifactError::serialization(&path, e))?;
        fs::write(&path, model).map_err(|e| ArtifactError::io(&path, e))?;

        if let Some(preprocessor) = &artifact.preprocessor {
            let path = staging.join(PREPROCESSOR_FILE);
            let bytes = serde_json::to_vec_pretty(preprocessor)
                .map_err(|e| ArtifactError::serialization(&path, e))?;
            fs::write(&path, bytes).map_err(|e| ArtifactError::io(&path, e))?;
        }

        let path = staging.join(VERSION_FILE);
        fs::write(&path, artifact.version.to_string()).map_err(|e| ArtifactError::io(&path, e))
    }

    /// Points `CURRENT` at `generation` with a temp-then-rename write
    fn commit(&self, generation: &str) -> Result<(), ArtifactError> {
        let target = self.dir.join(CURRENT_FILE);
        let staging = self.dir.join(format!(".{CURRENT_FILE}.tmp"));
        fs::write(&staging, generation).map_err(|e| ArtifactError::io(&staging, e))?;
        fs::rename(&staging, &target).map_err(|e| ArtifactError::io(&target, e))
    }

    fn discard(path: &Path) {
        if let Err(e) = fs::remove_dir_all(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove artifact directory");
            }
        }
    }
}

impl ArtifactStore for FileArtifactStore {
    fn load(&self) -> Result<Option<ModelArtifact>, ArtifactError> {
        let dir = self.active_dir()?;
        let Some(model) = Self::read_json::<DualHeadModel>(dir.join(MODEL_FILE))? else {
            debug!(dir = %dir.display(), "No stored model weights");
            return Ok(None);
        };
        model.validate()?;

        let preprocessor = Self::read_json::<Preprocessor>(dir.join(PREPROCESSOR_FILE))?;
        match &preprocessor {
            Some(p) => p.validate()?,
            None => warn!(dir = %dir.display(), "Model weights found without a preprocessor"),
        }

        let version = match Self::read_version(&dir)? {
            Some(version) => version,
            None => {
                warn!(dir = %dir.display(), "No version file, assuming {}", ModelVersion::initial());
                ModelVersion::initial()
            }
        };

        info!(dir = %dir.display(), %version, "Loaded model artifact");
        Ok(Some(ModelArtifact {
            model,
            preprocessor,
            version,
        }))
    }

    fn save(&self, artifact: &ModelArtifact) -> Result<(), ArtifactError> {
        fs::create_dir_all(&self.dir).map_err(|e| ArtifactError::io(&self.dir, e))?;
        let previous = self.current_generation().unwrap_or_else(|e| {
            warn!(error = %e, "Unreadable artifact pointer, it will be replaced");
            None
        });

        let generation = self.generation_name(artifact.version);
        let staging = self.dir.join(format!(".{generation}.tmp"));
        let target = self.dir.join(&generation);

        let staged = Self::stage(&staging, artifact)
            .and_then(|()| fs::rename(&staging, &target).map_err(|e| ArtifactError::io(&target, e)));
        if let Err(e) = staged {
            Self::discard(&staging);
            return Err(e);
        }

        if let Err(e) = self.commit(&generation) {
            Self::discard(&target);
            return Err(e);
        }

        if let Some(previous) = previous.filter(|p| *p != generation) {
            Self::discard(&self.dir.join(previous));
        }
        info!(dir = %self.dir.display(), %generation, version = %artifact.version, "Saved model artifact");
        Ok(())
    }

    fn current_version(&self) -> Result<Option<ModelVersion>, ArtifactError> {
        Self::read_version(&self.active_dir()?)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Keeps every saved artifact in memory
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    saved: Mutex<Vec<ModelArtifact>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `artifact` already saved
    pub fn with_artifact(artifact: ModelArtifact) -> Self {
        Self {
            saved: Mutex::new(vec![artifact]),
        }
    }

    /// Versions of every save, oldest first
    pub fn saved_versions(&self) -> Vec<ModelVersion> {
        self.saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|a| a.version)
            .collect()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn load(&self) -> Result<Option<ModelArtifact>, ArtifactError> {
        let saved = self.saved.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(saved.last().cloned())
    }

    fn save(&self, artifact: &ModelArtifact) -> Result<(), ArtifactError> {
        self.saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(artifact.clone());
        Ok(())
    }

    fn current_version(&self) -> Result<Option<ModelVersion>, ArtifactError> {
        let saved = self.saved.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(saved.last().map(|a| a.version))
    }
}
