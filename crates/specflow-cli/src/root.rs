use anyhow::Context;
use specflow_core::context::{self, Repo};
use std::path::{Path, PathBuf};

/// Directory the search for the repository starts from: `--root` /
/// `SPECFLOW_ROOT` when given, else the working directory.
pub fn start_dir(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Locate the repository and load its config.
pub fn open_repo(explicit: Option<&Path>) -> anyhow::Result<Repo> {
    let start = start_dir(explicit);
    Repo::discover(&start).with_context(|| format!("cannot open repository from {}", start.display()))
}

/// Root for `init`: an existing repository above the start directory, or
/// the start directory itself.
pub fn init_root(explicit: Option<&Path>) -> PathBuf {
    let start = start_dir(explicit);
    context::find_repo_root(&start).unwrap_or(start)
}

/// Feature override: `--feature` first, then the configured environment
/// variable (`SPECIFY_FEATURE` by default).
pub fn feature_override(flag: Option<&str>, repo: &Repo) -> Option<String> {
    if let Some(key) = flag {
        return Some(key.to_string());
    }
    let var = repo.config.feature_env.trim();
    if var.is_empty() {
        return None;
    }
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(start_dir(Some(dir.path())), dir.path());
    }

    #[test]
    fn init_root_prefers_enclosing_repository() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".specify")).unwrap();
        let nested = dir.path().join("docs/deep");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(init_root(Some(&nested)), dir.path());
    }

    #[test]
    fn flag_beats_environment() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".specify")).unwrap();
        let repo = Repo::discover(dir.path()).unwrap();
        assert_eq!(feature_override(Some("004"), &repo).as_deref(), Some("004"));
    }
}
