use crate::output::print_json;
use clap::Subcommand;
use specflow_core::config::WarnLevel;
use specflow_core::context::Repo;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration (file values over defaults)
    Show,
    /// Validate the config for common mistakes
    Validate,
}

pub fn run(repo: &Repo, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(repo, json),
        ConfigSubcommand::Validate => validate(repo, json),
    }
}

fn show(repo: &Repo, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&repo.config)?;
    } else {
        print!("{}", repo.config.to_yaml()?);
    }
    Ok(())
}

fn validate(repo: &Repo, json: bool) -> anyhow::Result<()> {
    let warnings = repo.config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
