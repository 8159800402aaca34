use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use specflow_core::context::{Repo, RepoContext};
use specflow_core::tasks::{self, TaskRecord, TaskTag};
use specflow_core::io;
use specflow_core::types::ArtifactKind;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// List tasks in file order
    List {
        /// Only tasks not yet checked off
        #[arg(long)]
        pending: bool,
        /// Only tasks carrying this tag (P, AUTO, REVIEW, SANDBOX)
        #[arg(long)]
        tag: Option<String>,
    },
    /// Show the first unchecked task whose dependencies are done
    Next,
    /// Check a task off
    Done { id: String },
    /// Uncheck a task
    Undo { id: String },
    /// Report malformed tasks, duplicate IDs and dependency problems
    Validate,
}

pub fn run(repo: &Repo, feature: Option<&str>, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    let ctx = super::resolve(repo, feature)?;
    match subcmd {
        TaskSubcommand::List { pending, tag } => list(&ctx, pending, tag.as_deref(), json),
        TaskSubcommand::Next => next(&ctx, json),
        TaskSubcommand::Done { id } => mark(&ctx, &id, true, json),
        TaskSubcommand::Undo { id } => mark(&ctx, &id, false, json),
        TaskSubcommand::Validate => validate(&ctx, json),
    }
}

fn read_tasks(ctx: &RepoContext) -> anyhow::Result<(PathBuf, String)> {
    let path = ctx.artifacts.path(ArtifactKind::Tasks);
    let text = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "no tasks.md for {} at {}; run the tasks phase first",
            ctx.feature.branch_name,
            path.display()
        )
    })?;
    Ok((path, text))
}

fn tags(t: &TaskRecord) -> String {
    t.tags.iter().map(|tag| tag.token()).collect::<Vec<_>>().join(",")
}

fn list(ctx: &RepoContext, pending: bool, tag: Option<&str>, json: bool) -> anyhow::Result<()> {
    let tag = match tag {
        Some(t) => {
            let token = t.trim_matches(|c| c == '[' || c == ']').to_uppercase();
            Some(TaskTag::from_token(&token).with_context(|| {
                format!("unknown tag '{t}': expected one of P, AUTO, REVIEW, SANDBOX")
            })?)
        }
        None => None,
    };
    let (_, text) = read_tasks(ctx)?;
    let all: Vec<TaskRecord> = tasks::parse(&text).collect();
    let summary = tasks::summary(&all);
    let shown: Vec<&TaskRecord> = all
        .iter()
        .filter(|t| !pending || !t.done)
        .filter(|t| tag.map_or(true, |tag| t.has_tag(tag)))
        .collect();

    if json {
        print_json(&serde_json::json!({ "tasks": shown, "summary": summary }))?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = shown
        .iter()
        .map(|t| {
            vec![
                t.id.clone().unwrap_or_else(|| "-".to_string()),
                if t.done { "[x]" } else { "[ ]" }.to_string(),
                tags(t),
                t.story_ref.clone().unwrap_or_default(),
                t.phase.clone().unwrap_or_default(),
                t.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "DONE", "TAGS", "STORY", "PHASE", "TITLE"], &rows);
    println!();
    println!("{summary}");
    Ok(())
}

fn next(ctx: &RepoContext, json: bool) -> anyhow::Result<()> {
    let (_, text) = read_tasks(ctx)?;
    let all: Vec<TaskRecord> = tasks::parse(&text).collect();
    let ready = tasks::next_ready(&all);

    if json {
        print_json(&serde_json::json!({ "next": ready }))?;
    } else {
        match ready {
            Some(t) => println!("{}", t.to_line()),
            None => println!("No ready tasks."),
        }
    }
    Ok(())
}

fn mark(ctx: &RepoContext, id: &str, done: bool, json: bool) -> anyhow::Result<()> {
    let (path, text) = read_tasks(ctx)?;
    let updated = tasks::set_done(&text, id, done)
        .with_context(|| format!("in {}", path.display()))?;
    if updated != text {
        io::atomic_write(&path, updated.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if json {
        print_json(&serde_json::json!({ "id": id, "done": done, "path": path }))?;
    } else if done {
        println!("Checked off [{id}]");
    } else {
        println!("Unchecked [{id}]");
    }
    Ok(())
}

fn validate(ctx: &RepoContext, json: bool) -> anyhow::Result<()> {
    let (_, text) = read_tasks(ctx)?;
    let all: Vec<TaskRecord> = tasks::parse(&text).collect();
    let issues = tasks::validate(&all);

    if json {
        print_json(&serde_json::json!({ "tasks": all.len(), "issues": issues }))?;
    } else if issues.is_empty() {
        println!("{} tasks, no issues.", all.len());
    } else {
        for issue in &issues {
            println!("[error] {issue}");
        }
    }

    if !issues.is_empty() {
        anyhow::bail!("tasks.md has {} issue(s)", issues.len());
    }
    Ok(())
}
