//! Repository and active-feature resolution.
//!
//! Nothing here is cached between calls: every `resolve` re-reads the
//! filesystem and the checked-out branch and hands back an explicit
//! [`RepoContext`] that callers thread through later operations.

use crate::artifact::ArtifactSet;
use crate::config::Config;
use crate::error::{NoFeatureReason, Result, SpecflowError};
use crate::feature::{self, FeatureIdentity};
use crate::git;
use crate::paths;
use serde::Serialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Repo
// ---------------------------------------------------------------------------

/// A located repository and its loaded configuration.
#[derive(Debug, Clone)]
pub struct Repo {
    pub root: PathBuf,
    /// Inside a git work tree with `git` on PATH.
    pub has_git: bool,
    pub config: Config,
}

/// Walk upward from `start` to the nearest directory holding `.git` (a
/// directory, or a file for worktrees) or `.specify/`.
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    let mut dir = Some(start);
    while let Some(d) = dir {
        if d.join(".git").exists() || paths::specify_dir(d).is_dir() {
            return Ok(d.to_path_buf());
        }
        dir = d.parent();
    }
    Err(SpecflowError::NotARepository {
        start: start.to_path_buf(),
    })
}

fn inside_git(root: &Path) -> bool {
    root.ancestors().any(|d| d.join(".git").exists())
}

impl Repo {
    pub fn discover(start: &Path) -> Result<Self> {
        let root = find_repo_root(start)?;
        let has_git = inside_git(&root) && git::git_available();
        let config = Config::load(&root)?;
        tracing::debug!(root = %root.display(), has_git, "repository located");
        Ok(Self {
            root,
            has_git,
            config,
        })
    }

    pub fn specs_root(&self) -> PathBuf {
        paths::specs_root(&self.root, &self.config)
    }

    pub fn templates_dir(&self) -> PathBuf {
        paths::templates_dir(&self.root, &self.config)
    }

    /// Branch names known to git, or none outside git.
    pub fn branches(&self) -> Result<Vec<String>> {
        if !self.has_git {
            return Ok(Vec::new());
        }
        git::branches(&self.root)
    }

    pub fn current_branch(&self) -> Option<String> {
        if !self.has_git {
            return None;
        }
        match git::current_branch(&self.root) {
            Ok(branch) => Some(branch),
            Err(e) => {
                tracing::debug!(error = %e, "could not read current branch");
                None
            }
        }
    }

    /// Determine the active feature: the override if it names an existing
    /// feature directory, otherwise the checked-out `NNN-slug` branch.
    pub fn resolve(&self, override_key: Option<&str>) -> Result<RepoContext> {
        let specs_root = self.specs_root();
        let key = override_key.map(str::trim).filter(|k| !k.is_empty());

        if let Some(key) = key {
            if let Some(feature) = feature::find(&specs_root, key)? {
                tracing::debug!(feature = %feature.branch_name, "feature from override");
                return Ok(self.context(specs_root, feature, FeatureSource::Override));
            }
            tracing::warn!(key, "feature override names no feature directory; trying the branch");
        }

        let no_feature = |reason| SpecflowError::NoActiveFeature {
            root: self.root.clone(),
            reason,
        };

        let Some(branch) = self.current_branch() else {
            return Err(no_feature(match key {
                Some(k) => NoFeatureReason::OverrideNotFound { key: k.to_string() },
                None => NoFeatureReason::NoBranch,
            }));
        };

        let Some((number, slug)) = paths::parse_feature_name(&branch) else {
            return Err(no_feature(match key {
                Some(k) => NoFeatureReason::OverrideNotFound { key: k.to_string() },
                None => NoFeatureReason::NotOnFeatureBranch { branch },
            }));
        };

        // Several branches may work on one spec directory: fall back to the
        // directory that shares the branch's number.
        let feature = match feature::find(&specs_root, &branch)? {
            Some(found) => found,
            None => FeatureIdentity::new(&specs_root, number, slug),
        };
        tracing::debug!(branch = %branch, feature = %feature.branch_name, "feature from branch");
        Ok(self.context(specs_root, feature, FeatureSource::Branch))
    }

    fn context(&self, specs_root: PathBuf, feature: FeatureIdentity, source: FeatureSource) -> RepoContext {
        let artifacts = ArtifactSet::new(&self.root, feature.directory.clone(), &self.config);
        RepoContext {
            repo_root: self.root.clone(),
            specs_root,
            has_git: self.has_git,
            feature,
            source,
            artifacts,
        }
    }
}

// ---------------------------------------------------------------------------
// RepoContext
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSource {
    Override,
    Branch,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepoContext {
    pub repo_root: PathBuf,
    pub specs_root: PathBuf,
    pub has_git: bool,
    pub feature: FeatureIdentity,
    pub source: FeatureSource,
    pub artifacts: ArtifactSet,
}

/// Locate the repository above `start` and resolve its active feature.
pub fn resolve(start: &Path, override_key: Option<&str>) -> Result<(Repo, RepoContext)> {
    let repo = Repo::discover(start)?;
    let ctx = repo.resolve(override_key)?;
    Ok((repo, ctx))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn plain_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".specify")).unwrap();
        std::fs::create_dir_all(dir.path().join("specs/003-old-thing")).unwrap();
        dir
    }

    fn git(dir: &Path, args: &[&str]) {
        let out = Command::new("git").args(args).current_dir(dir).output().unwrap();
        assert!(out.status.success(), "git {args:?} failed");
    }

    #[test]
    fn root_found_from_nested_dir() {
        let dir = plain_repo();
        let nested = dir.path().join("specs/003-old-thing");
        assert_eq!(find_repo_root(&nested).unwrap(), dir.path());
    }

    #[test]
    fn no_markers_is_not_a_repository() {
        let dir = TempDir::new().unwrap();
        if dir.path().ancestors().any(|d| d.join(".git").exists() || d.join(".specify").is_dir()) {
            return;
        }
        assert!(matches!(
            find_repo_root(dir.path()),
            Err(SpecflowError::NotARepository { .. })
        ));
    }

    #[test]
    fn override_by_name_and_prefix() {
        let dir = plain_repo();
        let (_, ctx) = resolve(dir.path(), Some("003-old-thing")).unwrap();
        assert_eq!(ctx.feature.number, 3);
        assert_eq!(ctx.source, FeatureSource::Override);
        assert_eq!(
            ctx.artifacts.path(crate::types::ArtifactKind::Spec),
            dir.path().join("specs/003-old-thing/spec.md")
        );

        let (_, ctx) = resolve(dir.path(), Some("3")).unwrap();
        assert_eq!(ctx.feature.branch_name, "003-old-thing");
    }

    #[test]
    fn missing_override_without_git_names_the_key() {
        let dir = plain_repo();
        let repo = Repo {
            root: dir.path().to_path_buf(),
            has_git: false,
            config: Config::default(),
        };
        match repo.resolve(Some("999-nope")) {
            Err(SpecflowError::NoActiveFeature { reason, root }) => {
                assert_eq!(root, dir.path());
                assert_eq!(
                    reason,
                    NoFeatureReason::OverrideNotFound {
                        key: "999-nope".to_string()
                    }
                );
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            repo.resolve(None),
            Err(SpecflowError::NoActiveFeature {
                reason: NoFeatureReason::NoBranch,
                ..
            })
        ));
    }

    #[test]
    fn branch_selects_feature() {
        if !git::git_available() {
            return;
        }
        let dir = plain_repo();
        git(dir.path(), &["init", "-q"]);
        git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);

        match resolve(dir.path(), None) {
            Err(SpecflowError::NoActiveFeature {
                reason: NoFeatureReason::NotOnFeatureBranch { branch },
                ..
            }) => assert_eq!(branch, "main"),
            other => panic!("unexpected: {other:?}"),
        }

        git(dir.path(), &["checkout", "-q", "-b", "004-add-oauth-login"]);
        let (_, ctx) = resolve(dir.path(), None).unwrap();
        assert_eq!(ctx.source, FeatureSource::Branch);
        assert_eq!(ctx.feature.branch_name, "004-add-oauth-login");
        assert_eq!(ctx.feature.directory, dir.path().join("specs/004-add-oauth-login"));

        git(dir.path(), &["checkout", "-q", "-b", "003-alternate-take"]);
        let (_, ctx) = resolve(dir.path(), None).unwrap();
        assert_eq!(ctx.feature.branch_name, "003-old-thing");

        // An override that names nothing falls through to the branch.
        let (_, ctx) = resolve(dir.path(), Some("777")).unwrap();
        assert_eq!(ctx.feature.branch_name, "003-old-thing");
    }
}
