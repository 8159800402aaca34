pub mod agent;
pub mod artifact;
pub mod check;
pub mod config;
pub mod feature;
pub mod init;
pub mod paths;
pub mod task;

use anyhow::Context;
use specflow_core::context::{Repo, RepoContext};

/// Resolve the active feature, honouring `--feature` and the configured
/// override variable.
pub fn resolve(repo: &Repo, feature: Option<&str>) -> anyhow::Result<RepoContext> {
    let key = crate::root::feature_override(feature, repo);
    repo.resolve(key.as_deref()).with_context(|| match &key {
        Some(k) => format!("cannot resolve feature '{k}'"),
        None => "cannot resolve the active feature".to_string(),
    })
}
