use crate::config::{Config, Thresholds};
use crate::error::Result;
use crate::io;
use crate::paths;
use crate::template::{self, TemplateSource};
use crate::types::ArtifactKind;
use serde::Serialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ArtifactStatus
// ---------------------------------------------------------------------------

/// Result of probing one artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactStatus {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub exists: bool,
    /// Byte length for files, entry count for directories.
    pub size: u64,
    /// The file is still an untouched copy of its template.
    pub unfilled: bool,
    pub present: bool,
}

// ---------------------------------------------------------------------------
// ArtifactSet
// ---------------------------------------------------------------------------

/// Paths of every artifact kind for one feature. Nothing is cached; each
/// probe reads the filesystem again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSet {
    pub feature_dir: PathBuf,
    pub constitution: PathBuf,
    pub templates_dir: PathBuf,
}

impl ArtifactSet {
    pub fn new(repo_root: &Path, feature_dir: PathBuf, cfg: &Config) -> Self {
        Self {
            feature_dir,
            constitution: paths::constitution_path(repo_root, cfg),
            templates_dir: paths::templates_dir(repo_root, cfg),
        }
    }

    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::Constitution => self.constitution.clone(),
            other => self.feature_dir.join(other.filename()),
        }
    }

    /// A file is present when it holds at least the configured minimum
    /// number of bytes and is no longer a verbatim copy of its template; a
    /// directory when it has at least one entry.
    pub fn probe(&self, kind: ArtifactKind, thresholds: &Thresholds) -> ArtifactStatus {
        let path = self.path(kind);
        let (exists, size) = if kind.is_dir() {
            match std::fs::read_dir(&path) {
                Ok(entries) => (true, entries.count() as u64),
                Err(_) => (false, 0),
            }
        } else {
            match std::fs::metadata(&path) {
                Ok(meta) if meta.is_file() => (true, meta.len()),
                _ => (false, 0),
            }
        };
        let big_enough = exists
            && if kind.is_dir() {
                size > 0
            } else {
                size >= thresholds.min_bytes(kind).max(1)
            };
        let unfilled = big_enough && self.is_unfilled(kind, &path);
        ArtifactStatus {
            kind,
            path,
            exists,
            size,
            unfilled,
            present: big_enough && !unfilled,
        }
    }

    /// Compared against the templates directory copy and the bundled copy,
    /// since either may have produced the file.
    fn is_unfilled(&self, kind: ArtifactKind, path: &Path) -> bool {
        let Some(name) = kind.template_name() else {
            return false;
        };
        let Ok(text) = std::fs::read_to_string(path) else {
            return false;
        };
        let on_disk = std::fs::read_to_string(self.templates_dir.join(name)).ok();
        let mut candidates: Vec<&str> = on_disk.as_deref().into_iter().collect();
        candidates.extend(template::bundled(name));
        candidates.iter().any(|t| template::is_unfilled(t, &text))
    }

    pub fn is_present(&self, kind: ArtifactKind, thresholds: &Thresholds) -> bool {
        self.probe(kind, thresholds).present
    }

    /// Every kind in declaration order.
    pub fn report(&self, thresholds: &Thresholds) -> Vec<ArtifactStatus> {
        ArtifactKind::all()
            .iter()
            .map(|&k| self.probe(k, thresholds))
            .collect()
    }

    /// Create the artifact from `source` unless something is already at its
    /// path. Directories are created empty. Returns true if anything was
    /// written.
    pub fn scaffold(
        &self,
        kind: ArtifactKind,
        source: &TemplateSource,
        vars: &[(&str, &str)],
    ) -> Result<bool> {
        let path = self.path(kind);
        if path.exists() {
            return Ok(false);
        }
        if kind.is_dir() {
            io::ensure_dir(&path)?;
            return Ok(true);
        }
        let text = template::render(&source.read()?, vars);
        io::write_if_missing(&path, text.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
