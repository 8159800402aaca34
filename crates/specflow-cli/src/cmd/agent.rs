use crate::output::{print_json, print_table, yes_no};
use anyhow::Context;
use clap::Subcommand;
use specflow_core::agents::{DerivedContext, Synchronizer};
use specflow_core::context::Repo;
use specflow_core::types::ArtifactKind;

#[derive(Subcommand)]
pub enum AgentSubcommand {
    /// List known agents and their context files
    List,
    /// Regenerate agent context files from the active feature's plan
    Sync {
        /// Agent keys (default: agents whose files exist, else the canonical one and claude)
        keys: Vec<String>,
        /// Every known agent
        #[arg(long, conflicts_with = "keys")]
        all: bool,
    },
}

pub fn run(repo: &Repo, feature: Option<&str>, subcmd: AgentSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        AgentSubcommand::List => list(repo, json),
        AgentSubcommand::Sync { keys, all } => sync(repo, feature, &keys, all, json),
    }
}

fn list(repo: &Repo, json: bool) -> anyhow::Result<()> {
    let profiles = repo.config.agent_profiles();
    if json {
        let items: Vec<_> = profiles
            .iter()
            .map(|p| {
                serde_json::json!({
                    "profile": p,
                    "exists": p.path_in(&repo.root).is_file(),
                    "canonical": p.key == repo.config.canonical_agent,
                })
            })
            .collect();
        print_json(&items)?;
        return Ok(());
    }
    let rows: Vec<Vec<String>> = profiles
        .iter()
        .map(|p| {
            let key = if p.key == repo.config.canonical_agent {
                format!("{} *", p.key)
            } else {
                p.key.clone()
            };
            vec![
                key,
                p.name.clone(),
                p.format.as_str().to_string(),
                yes_no(p.path_in(&repo.root).is_file()),
                p.context_file.display().to_string(),
            ]
        })
        .collect();
    print_table(&["KEY", "NAME", "FORMAT", "EXISTS", "PATH"], &rows);
    Ok(())
}

fn sync(repo: &Repo, feature: Option<&str>, keys: &[String], all: bool, json: bool) -> anyhow::Result<()> {
    let ctx = super::resolve(repo, feature)?;
    let plan_path = ctx.artifacts.path(ArtifactKind::Plan);
    let plan = std::fs::read_to_string(&plan_path).with_context(|| {
        format!(
            "no plan.md for {} at {}; run the plan phase first",
            ctx.feature.branch_name,
            plan_path.display()
        )
    })?;
    let derived = DerivedContext::from_plan(&plan, &ctx.feature.branch_name);

    let sync = Synchronizer::new(repo).context("invalid agent configuration")?;
    let selected = if all {
        sync.profiles().to_vec()
    } else if keys.is_empty() {
        sync.default_selection()
    } else {
        sync.select(keys)?
    };
    let reports = sync
        .synchronize(&selected, &derived)
        .context("agent context synchronization failed")?;

    if json {
        print_json(&serde_json::json!({ "derived": derived, "reports": reports }))?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = reports
        .iter()
        .map(|r| {
            vec![
                r.outcome.as_str().to_string(),
                r.agents.join(", "),
                r.path.strip_prefix(&repo.root).unwrap_or(&r.path).display().to_string(),
            ]
        })
        .collect();
    print_table(&["OUTCOME", "AGENTS", "PATH"], &rows);
    for w in reports.iter().flat_map(|r| &r.warnings) {
        eprintln!("warning: {w}");
    }
    Ok(())
}
