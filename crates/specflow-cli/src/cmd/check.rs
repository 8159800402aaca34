use crate::output::print_json;
use specflow_core::context::Repo;
use specflow_core::gate;
use specflow_core::types::{ArtifactKind, Phase};

fn names(kinds: &[ArtifactKind]) -> String {
    kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
}

pub fn run(repo: &Repo, feature: Option<&str>, phase: &str, json: bool) -> anyhow::Result<()> {
    let phase: Phase = phase.parse()?;
    let ctx = super::resolve(repo, feature)?;
    let decision = gate::check(phase, &ctx.artifacts, &repo.config.thresholds);

    if json {
        print_json(&serde_json::json!({
            "feature": ctx.feature.branch_name,
            "feature_dir": ctx.feature.directory,
            "decision": decision,
        }))?;
    } else {
        println!("{} ({})", decision, ctx.feature.branch_name);
        for w in &decision.warnings {
            println!("  warning: {w}");
        }
        if !decision.available.is_empty() {
            println!("  available: {}", names(&decision.available));
        }
    }

    if !decision.allowed {
        anyhow::bail!(
            "phase '{phase}' is blocked for {}: missing {}",
            ctx.feature.branch_name,
            names(&decision.missing)
        );
    }
    Ok(())
}
