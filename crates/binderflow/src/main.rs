use anyhow::Context;
use binderflow_build::{
    CommandRunner, Docker, DryRunRunner, Pipeline, PipelineError, Repo2Docker, RunSummary,
    SystemRunner, Tools,
};
use binderflow_config::{BuildPlan, CiContext, Inputs};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "binderflow", version)]
#[command(
    about = "Build a repository into a container image with repo2docker, test it, and push it",
    long_about = "Build a repository into a container image with repo2docker, test it, and push it.\n\n\
                  Options are read from INPUT_<NAME> environment variables \
                  (INPUT_IMAGE_NAME, INPUT_DOCKER_USERNAME, INPUT_NO_PUSH, ...)."
)]
struct Cli {
    /// Repository to build (defaults to the current directory)
    #[arg(long, env = "GITHUB_WORKSPACE")]
    source_dir: Option<PathBuf>,

    /// Repository identifier, owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// Commit being built
    #[arg(long, env = "GITHUB_SHA")]
    sha: Option<String>,

    /// Identity that triggered the run
    #[arg(long, env = "GITHUB_ACTOR")]
    actor: Option<String>,

    /// docker executable
    #[arg(long, env = "BINDERFLOW_DOCKER", default_value = "docker")]
    docker: String,

    /// repo2docker executable
    #[arg(long, env = "BINDERFLOW_REPO2DOCKER", default_value = "jupyter-repo2docker")]
    repo2docker: String,

    /// Log the commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Print the resolved build plan as JSON and exit
    #[arg(long, conflicts_with = "dry_run")]
    print_plan: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // stdout carries the CI group markers and the tools' own output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default.into())
                .from_env_lossy(),
        )
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        let code = e
            .downcast_ref::<PipelineError>()
            .map(PipelineError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let inputs = Inputs::from_env();
    let ctx = CiContext::new(cli.repository, cli.sha, cli.actor);
    let plan = BuildPlan::resolve(&inputs, &ctx).map_err(PipelineError::from)?;

    if cli.print_plan {
        let json = serde_json::to_string_pretty(&plan).context("failed to serialize build plan")?;
        println!("{}", json);
        return Ok(());
    }

    let source_dir = match cli.source_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to determine current directory")?,
    };

    println!("{} {}", "Image:".bold(), plan.full_image_name.cyan());
    println!("{} {}", "Source:".bold(), source_dir.display());
    if cli.dry_run {
        println!("{}", "Dry run: no commands will be executed".yellow());
    }

    let runner: Arc<dyn CommandRunner> = if cli.dry_run {
        Arc::new(DryRunRunner)
    } else {
        Arc::new(SystemRunner)
    };
    let tools = Tools {
        docker: Docker::new(cli.docker),
        repo2docker: Repo2Docker::new(cli.repo2docker),
    };

    let summary = Pipeline::new(plan, source_dir, runner, tools).run().await?;
    print_summary(&summary, cli.dry_run);

    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    println!();
    if dry_run {
        let mark = "[dry-run]".yellow();
        println!("{} Would build {}", mark, summary.built.cyan());
        if summary.tested {
            println!("{} Would run image tests", mark);
        }
        for image in &summary.pushed {
            println!("{} Would push {}", mark, image.cyan());
        }
        return;
    }

    println!("{} Built {}", "✓".green(), summary.built.cyan());
    if summary.tested {
        println!("{} Image tests passed", "✓".green());
    }
    for image in &summary.pushed {
        println!("{} Pushed {}", "✓".green(), image.cyan());
    }
    for image in &summary.failed_pushes {
        println!("{} Failed to push {}", "⚠".yellow(), image.yellow());
    }
}
