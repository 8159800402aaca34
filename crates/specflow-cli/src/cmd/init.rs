use crate::output::print_json;
use anyhow::Context;
use specflow_core::{config::Config, io, paths, template};
use std::path::Path;

/// Idempotent: existing files are reported and left alone.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config_path = paths::config_path(root);
    let config_created = if config_path.exists() {
        false
    } else {
        Config::default()
            .save(root)
            .context("failed to write .specify/config.yaml")?;
        true
    };
    let cfg = Config::load(root).context("failed to load .specify/config.yaml")?;

    let specs = paths::specs_root(root, &cfg);
    io::ensure_dir(&specs).with_context(|| format!("failed to create {}", specs.display()))?;

    let templates = paths::templates_dir(root, &cfg);
    let mut written = Vec::new();
    let mut kept = Vec::new();
    for name in template::bundled_names() {
        let Some(text) = template::bundled(name) else {
            continue;
        };
        let path = templates.join(name);
        if io::write_if_missing(&path, text.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?
        {
            written.push(path);
        } else {
            kept.push(path);
        }
    }

    if json {
        print_json(&serde_json::json!({
            "root": root,
            "config_created": config_created,
            "specs_root": specs,
            "templates_written": written,
            "templates_kept": kept,
        }))?;
        return Ok(());
    }

    println!("Initializing specflow in: {}", root.display());
    let status = |created: bool| if created { "created:" } else { "exists: " };
    println!("  {} {}", status(config_created), paths::CONFIG_FILE);
    println!("  ready:   {}", specs.display());
    for p in &written {
        println!("  {} {}", status(true), p.display());
    }
    for p in &kept {
        println!("  {} {}", status(false), p.display());
    }
    Ok(())
}
