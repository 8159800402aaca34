use crate::output::{print_json, print_pairs, print_table, yes_no};
use specflow_core::context::Repo;
use specflow_core::types::ArtifactKind;

pub fn run(repo: &Repo, feature: Option<&str>, json: bool) -> anyhow::Result<()> {
    let ctx = super::resolve(repo, feature)?;
    let report = ctx.artifacts.report(&repo.config.thresholds);
    let branch = repo.current_branch();

    if json {
        print_json(&serde_json::json!({
            "repo_root": ctx.repo_root,
            "specs_root": ctx.specs_root,
            "has_git": ctx.has_git,
            "current_branch": branch,
            "feature": ctx.feature,
            "source": ctx.source,
            "artifacts": report,
        }))?;
        return Ok(());
    }

    let path_of = |kind: ArtifactKind| ctx.artifacts.path(kind).display().to_string();
    print_pairs(&[
        ("REPO_ROOT", ctx.repo_root.display().to_string()),
        ("CURRENT_BRANCH", branch.unwrap_or_else(|| "(none)".to_string())),
        ("HAS_GIT", ctx.has_git.to_string()),
        ("FEATURE", ctx.feature.branch_name.clone()),
        ("FEATURE_DIR", ctx.feature.directory.display().to_string()),
        ("FEATURE_SPEC", path_of(ArtifactKind::Spec)),
        ("IMPL_PLAN", path_of(ArtifactKind::Plan)),
        ("TASKS", path_of(ArtifactKind::Tasks)),
    ]);
    println!();

    let rows: Vec<Vec<String>> = report
        .iter()
        .map(|s| {
            vec![
                s.kind.to_string(),
                yes_no(s.present),
                if s.exists { s.size.to_string() } else { "-".to_string() },
                s.path.display().to_string(),
            ]
        })
        .collect();
    print_table(&["ARTIFACT", "PRESENT", "SIZE", "PATH"], &rows);
    Ok(())
}
