mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    agent::AgentSubcommand, artifact::ArtifactSubcommand, config::ConfigSubcommand,
    feature::FeatureSubcommand, task::TaskSubcommand,
};
use specflow_core::context::Repo;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "specflow",
    about = "Spec-driven feature workflow: resolve the active feature, gate phases, parse tasks, sync agent context files",
    version,
    propagate_version = true
)]
struct Cli {
    /// Directory to start the repository search from (default: current directory)
    #[arg(long, global = true, env = "SPECFLOW_ROOT")]
    root: Option<PathBuf>,

    /// Active feature: directory name or numeric prefix (default: the
    /// configured environment variable, then the current branch)
    #[arg(long, global = true)]
    feature: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create specs/, bundled templates and a default config
    Init,

    /// Show the repository root, active feature and artifact paths
    Paths,

    /// Check whether a phase may start (exit status 1 when blocked)
    Check {
        /// specify, plan, tasks or implement
        phase: String,
    },

    /// Create and list features
    Feature {
        #[command(subcommand)]
        subcommand: FeatureSubcommand,
    },

    /// Inspect and scaffold the active feature's artifacts
    Artifact {
        #[command(subcommand)]
        subcommand: ArtifactSubcommand,
    },

    /// Read and update the active feature's tasks.md
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// List agents and synchronize their context files
    Agent {
        #[command(subcommand)]
        subcommand: AgentSubcommand,
    },

    /// Show or validate .specify/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let explicit = cli.root.as_deref();

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root::init_root(explicit), cli.json),
        command => root::open_repo(explicit)
            .and_then(|repo| dispatch(&repo, cli.feature.as_deref(), command, cli.json)),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn dispatch(
    repo: &Repo,
    feature: Option<&str>,
    command: Commands,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        Commands::Init => cmd::init::run(&repo.root, json),
        Commands::Paths => cmd::paths::run(repo, feature, json),
        Commands::Check { phase } => cmd::check::run(repo, feature, &phase, json),
        Commands::Feature { subcommand } => cmd::feature::run(repo, subcommand, json),
        Commands::Artifact { subcommand } => cmd::artifact::run(repo, feature, subcommand, json),
        Commands::Task { subcommand } => cmd::task::run(repo, feature, subcommand, json),
        Commands::Agent { subcommand } => cmd::agent::run(repo, feature, subcommand, json),
        Commands::Config { subcommand } => cmd::config::run(repo, subcommand, json),
    }
}
