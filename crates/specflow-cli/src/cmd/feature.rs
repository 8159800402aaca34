use crate::output::{print_json, print_pairs, print_table, yes_no};
use anyhow::Context;
use clap::Subcommand;
use specflow_core::allocator::FeatureAllocator;
use specflow_core::artifact::ArtifactSet;
use specflow_core::context::Repo;
use specflow_core::types::ArtifactKind;
use specflow_core::{feature, paths};

#[derive(Subcommand)]
pub enum FeatureSubcommand {
    /// Allocate the next feature number, create its spec and branch
    Create {
        /// Free-text description; the first words become the slug
        #[arg(required = true)]
        words: Vec<String>,
        /// Do not create or check out a branch
        #[arg(long)]
        no_branch: bool,
    },
    /// List feature directories under the specs root
    List,
    /// Print the number the next feature would receive
    NextNumber,
}

pub fn run(repo: &Repo, subcmd: FeatureSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        FeatureSubcommand::Create { words, no_branch } => {
            create(repo, &words.join(" "), no_branch, json)
        }
        FeatureSubcommand::List => list(repo, json),
        FeatureSubcommand::NextNumber => next_number(repo, json),
    }
}

fn create(repo: &Repo, description: &str, no_branch: bool, json: bool) -> anyhow::Result<()> {
    let allocator = FeatureAllocator::new(repo).with_branches(repo.config.branches && !no_branch);
    let alloc = allocator
        .create(description)
        .with_context(|| format!("failed to create feature for '{description}'"))?;

    if json {
        print_json(&serde_json::json!({
            "BRANCH_NAME": alloc.feature.branch_name,
            "SPEC_FILE": alloc.spec_file,
            "FEATURE_NUM": paths::format_number(alloc.feature.number),
            "feature": alloc.feature,
            "branch_created": alloc.branch_created,
        }))?;
        return Ok(());
    }

    print_pairs(&[
        ("BRANCH_NAME", alloc.feature.branch_name.clone()),
        ("SPEC_FILE", alloc.spec_file.display().to_string()),
        ("FEATURE_NUM", paths::format_number(alloc.feature.number)),
    ]);
    if !alloc.branch_created {
        println!(
            "note: no branch created; select this feature with --feature {} or {}={}",
            alloc.feature.branch_name, repo.config.feature_env, alloc.feature.branch_name
        );
    }
    Ok(())
}

fn list(repo: &Repo, json: bool) -> anyhow::Result<()> {
    let specs_root = repo.specs_root();
    let features = feature::list(&specs_root).context("failed to read specs root")?;
    let branch = repo.current_branch();
    let thresholds = &repo.config.thresholds;

    let rows: Vec<(feature::FeatureIdentity, bool, [bool; 3])> = features
        .into_iter()
        .map(|f| {
            let set = ArtifactSet::new(&repo.root, f.directory.clone(), &repo.config);
            let present = [ArtifactKind::Spec, ArtifactKind::Plan, ArtifactKind::Tasks]
                .map(|k| set.is_present(k, thresholds));
            let current = branch.as_deref() == Some(f.branch_name.as_str());
            (f, current, present)
        })
        .collect();

    if json {
        let items: Vec<_> = rows
            .iter()
            .map(|(f, current, [spec, plan, tasks])| {
                serde_json::json!({
                    "feature": f,
                    "current": current,
                    "spec": spec,
                    "plan": plan,
                    "tasks": tasks,
                })
            })
            .collect();
        print_json(&items)?;
        return Ok(());
    }

    if rows.is_empty() {
        println!("No features under {}.", specs_root.display());
        return Ok(());
    }
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|(f, current, [spec, plan, tasks])| {
            vec![
                if *current { "*" } else { "" }.to_string(),
                paths::format_number(f.number),
                f.branch_name.clone(),
                yes_no(*spec),
                yes_no(*plan),
                yes_no(*tasks),
            ]
        })
        .collect();
    print_table(&["", "NUM", "FEATURE", "SPEC", "PLAN", "TASKS"], &table);
    Ok(())
}

fn next_number(repo: &Repo, json: bool) -> anyhow::Result<()> {
    let branches = repo.branches().context("failed to list branches")?;
    let next = feature::highest_number(&repo.specs_root(), &branches)? + 1;
    let padded = paths::format_number(next);
    if json {
        print_json(&serde_json::json!({ "next_number": padded }))?;
    } else {
        println!("{padded}");
    }
    Ok(())
}
