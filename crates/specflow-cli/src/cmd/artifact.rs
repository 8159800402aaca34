use crate::output::{print_json, print_table, yes_no};
use anyhow::Context;
use clap::Subcommand;
use specflow_core::context::Repo;
use specflow_core::gate;
use specflow_core::template::TemplateSource;
use specflow_core::types::ArtifactKind;

#[derive(Subcommand)]
pub enum ArtifactSubcommand {
    /// Show every artifact of the active feature and whether it is present
    List,
    /// Create an artifact from its template if it does not exist yet
    Init {
        /// spec, plan, tasks, research, data-model, quickstart, contracts-dir, constitution
        kind: String,
        /// Scaffold even when the producing phase is blocked
        #[arg(long)]
        force: bool,
    },
}

pub fn run(
    repo: &Repo,
    feature: Option<&str>,
    subcmd: ArtifactSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        ArtifactSubcommand::List => list(repo, feature, json),
        ArtifactSubcommand::Init { kind, force } => init(repo, feature, &kind, force, json),
    }
}

fn list(repo: &Repo, feature: Option<&str>, json: bool) -> anyhow::Result<()> {
    let ctx = super::resolve(repo, feature)?;
    let report = ctx.artifacts.report(&repo.config.thresholds);
    if json {
        print_json(&report)?;
        return Ok(());
    }
    let rows: Vec<Vec<String>> = report
        .iter()
        .map(|s| {
            vec![
                s.kind.to_string(),
                s.kind.produced_in().to_string(),
                yes_no(s.exists),
                yes_no(s.present),
                s.path.display().to_string(),
            ]
        })
        .collect();
    print_table(&["ARTIFACT", "PHASE", "EXISTS", "PRESENT", "PATH"], &rows);
    Ok(())
}

fn init(repo: &Repo, feature: Option<&str>, kind: &str, force: bool, json: bool) -> anyhow::Result<()> {
    let kind: ArtifactKind = kind.parse()?;
    let ctx = super::resolve(repo, feature)?;

    let phase = kind.produced_in();
    let decision = gate::check(phase, &ctx.artifacts, &repo.config.thresholds);
    if !decision.allowed && !force {
        let missing: Vec<&str> = decision.missing.iter().map(|k| k.as_str()).collect();
        anyhow::bail!(
            "cannot scaffold {kind}: phase '{phase}' is blocked for {} (missing: {}); use --force to override",
            ctx.feature.branch_name,
            missing.join(", ")
        );
    }

    let source = match kind.template_name() {
        Some(name) => TemplateSource::lookup(&repo.templates_dir(), name),
        None => TemplateSource::Empty,
    };
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    let name = ctx.feature.branch_name.as_str();
    let created = ctx
        .artifacts
        .scaffold(
            kind,
            &source,
            &[
                ("FEATURE NAME", name),
                ("FEATURE", name),
                ("###-feature-name", name),
                ("###-feature", name),
                ("DATE", today.as_str()),
            ],
        )
        .with_context(|| format!("failed to scaffold {kind}"))?;

    let path = ctx.artifacts.path(kind);
    if json {
        print_json(&serde_json::json!({
            "kind": kind,
            "path": path,
            "created": created,
            "forced": force && !decision.allowed,
        }))?;
    } else if created {
        println!("created: {}", path.display());
    } else {
        println!("exists:  {}", path.display());
    }
    Ok(())
}
