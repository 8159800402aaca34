use crate::error::{Result, SpecflowError};
use std::path::Path;
use std::process::Command;

/// True when a `git` executable is on PATH.
pub fn git_available() -> bool {
    which::which("git").is_ok()
}

/// Run `git <args>` in `root` and return trimmed stdout.
fn run(root: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git").args(args).current_dir(root).output()?;
    if !output.status.success() {
        return Err(SpecflowError::Git {
            command: args.join(" "),
            root: root.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Name of the checked-out branch. Works on an unborn branch (fresh
/// repository without commits). A detached HEAD yields `"HEAD"`.
pub fn current_branch(root: &Path) -> Result<String> {
    match run(root, &["rev-parse", "--abbrev-ref", "HEAD"]) {
        Ok(branch) => Ok(branch),
        Err(_) => run(root, &["symbolic-ref", "--short", "HEAD"]),
    }
}

/// Local and remote branch names with the remote prefix stripped.
pub fn branches(root: &Path) -> Result<Vec<String>> {
    let out = run(root, &["branch", "-a", "--format=%(refname)"])?;
    let mut names: Vec<String> = out
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if let Some(local) = line.strip_prefix("refs/heads/") {
                return Some(local.to_string());
            }
            let remote = line.strip_prefix("refs/remotes/")?;
            let (_, name) = remote.split_once('/')?;
            (name != "HEAD").then(|| name.to_string())
        })
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

/// Create `name` from the current HEAD and check it out.
pub fn create_branch(root: &Path, name: &str) -> Result<()> {
    run(root, &["checkout", "-b", name])?;
    tracing::info!(branch = name, "created branch");
    Ok(())
}
