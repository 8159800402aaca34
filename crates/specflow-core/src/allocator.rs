//! Feature allocation: pick the next number, create the spec directory and
//! branch.
//!
//! The scan for the highest number and the creation of the new directory
//! happen under an exclusive advisory lock on `<specs>/.specflow.lock`, so
//! concurrent allocations in one repository never share a number. The
//! branch is created last; if that fails the directory is removed again.

use crate::context::Repo;
use crate::error::{Result, SpecflowError};
use crate::feature::{self, FeatureIdentity};
use crate::git;
use crate::io::{self, DirLock};
use crate::paths;
use crate::template::{self, TemplateSource};
use crate::types::ArtifactKind;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub feature: FeatureIdentity,
    pub spec_file: PathBuf,
    pub branch_created: bool,
}

pub struct FeatureAllocator<'a> {
    repo: &'a Repo,
    create_branches: bool,
}

impl<'a> FeatureAllocator<'a> {
    pub fn new(repo: &'a Repo) -> Self {
        Self {
            repo,
            create_branches: repo.has_git && repo.config.branches,
        }
    }

    /// Disable (or re-enable, where git is available) branch creation.
    pub fn with_branches(mut self, enabled: bool) -> Self {
        self.create_branches = enabled && self.repo.has_git;
        self
    }

    /// Compute the identity the next allocation would receive. Takes no
    /// lock; use [`create`](Self::create) to claim it.
    pub fn allocate(&self, description: &str) -> Result<FeatureIdentity> {
        let slug = feature::slugify(description, self.repo.config.slug_max_words)?;
        let specs_root = self.repo.specs_root();
        let branches = self.repo.branches()?;
        let next = feature::highest_number(&specs_root, &branches)? + 1;
        Ok(FeatureIdentity::new(&specs_root, next, &slug))
    }

    /// Allocate under the specs-root lock and materialize the spec template.
    pub fn create(&self, description: &str) -> Result<Allocation> {
        let templates = self.repo.templates_dir();
        let source = TemplateSource::lookup(&templates, "spec-template.md");

        let specs_root = self.repo.specs_root();
        io::ensure_dir(&specs_root)?;
        let _lock = DirLock::acquire(&paths::alloc_lock_path(&specs_root))?;

        let identity = self.allocate(description)?;
        self.materialize(&identity, &source, description)
    }

    /// Create the feature directory with its `spec.md` and, when enabled,
    /// its branch. Either both exist afterwards or neither does.
    pub fn materialize(
        &self,
        identity: &FeatureIdentity,
        source: &TemplateSource,
        description: &str,
    ) -> Result<Allocation> {
        let specs_root = self.repo.specs_root();
        let duplicate = || SpecflowError::DuplicateFeature {
            name: identity.branch_name.clone(),
            specs_root: specs_root.clone(),
        };

        if self.create_branches && self.repo.branches()?.contains(&identity.branch_name) {
            return Err(duplicate());
        }

        io::ensure_dir(&specs_root)?;
        match std::fs::create_dir(&identity.directory) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Err(duplicate()),
            Err(e) => return Err(e.into()),
        }

        let spec_file = identity.directory.join(ArtifactKind::Spec.filename());
        let branch_created = match self.populate(identity, source, description, &spec_file) {
            Ok(created) => created,
            Err(e) => {
                if let Err(cleanup) = std::fs::remove_dir_all(&identity.directory) {
                    tracing::warn!(
                        dir = %identity.directory.display(),
                        error = %cleanup,
                        "failed to roll back feature directory"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(feature = %identity.branch_name, branch_created, "feature created");
        Ok(Allocation {
            feature: identity.clone(),
            spec_file,
            branch_created,
        })
    }

    fn populate(
        &self,
        identity: &FeatureIdentity,
        source: &TemplateSource,
        description: &str,
        spec_file: &std::path::Path,
    ) -> Result<bool> {
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        let text = template::render(
            &source.read()?,
            &[
                ("FEATURE NAME", description.trim()),
                ("###-feature-name", identity.branch_name.as_str()),
                ("DATE", today.as_str()),
                ("DESCRIPTION", description.trim()),
            ],
        );
        io::atomic_write(spec_file, text.as_bytes())?;

        if self.create_branches {
            git::create_branch(&self.repo.root, &identity.branch_name)?;
            return Ok(true);
        }
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
