//! pipeline-roles CLI - AWS role selection for CI pipelines
//!
//! Run `pipeline-roles --help` for usage information.

use clap::{Parser, Subcommand};
use pipeline_roles::actions::{Env, GitHubOidc, GitHubRunner, RecordingRunner, Runner, StaticToken};
use pipeline_roles::aws::{DryRunCredentialStep, LocalMappingStore, S3MappingStore, StsCredentialStep};
use pipeline_roles::config::{LogFormat, LoggingConfig, Settings};
use pipeline_roles::mapping::{self, RepositoriesMappings};
use pipeline_roles::pipeline::{
    Pipeline, RunStatus, ACCOUNT_INPUT, CONFIG_INPUT, MULTI_ACCOUNT_INPUT, NAME_INPUT,
};
use pipeline_roles::retry::RetryingRefresher;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "pipeline-roles",
    about = "Select and assume the AWS role of a CI pipeline from a repository mapping table",
    version
)]
struct Cli {
    /// Settings file path (TOML)
    #[arg(short, long, global = true, env = "PIPELINE_ROLES_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and assume the role for the current GitHub Actions run
    Run,

    /// Clear the variables published by `run`
    Cleanup,

    /// Resolve a role offline from a local mapping document
    Resolve {
        /// Mapping document (JSON)
        #[arg(short, long)]
        mappings: PathBuf,

        /// Repository name, with or without owner
        #[arg(short, long)]
        repository: String,

        /// Ref to match, e.g. refs/heads/main
        #[arg(long = "ref")]
        git_ref: String,

        /// Mapping name, bypasses ref matching
        #[arg(short, long)]
        name: Option<String>,

        /// Account to select from the mapping's roles
        #[arg(short, long)]
        account: Option<String>,

        /// Use the mapping's cross-account role
        #[arg(long)]
        multi_account: bool,
    },

    /// Check a local mapping document for structural problems
    Lint {
        /// Mapping document (JSON)
        mappings: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => match Settings::load(path).await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };

    init_logging(&settings.logging, cli.verbose);

    let result = match cli.command {
        Commands::Run => Ok(run(settings).await),
        Commands::Cleanup => cleanup(settings),
        Commands::Resolve {
            mappings,
            repository,
            git_ref,
            name,
            account,
            multi_account,
        } => {
            resolve(
                settings,
                mappings,
                repository,
                git_ref,
                name,
                account,
                multi_account,
            )
            .await
        }
        Commands::Lint { mappings } => lint(&mappings).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(logging: &LoggingConfig, verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str())),
        1 => EnvFilter::default().add_directive(Level::DEBUG.into()),
        _ => EnvFilter::default().add_directive(Level::TRACE.into()),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

fn github_pipeline(settings: Settings) -> Pipeline {
    let runner: Arc<dyn Runner> = Arc::new(GitHubRunner::new());
    let tokens = Arc::new(GitHubOidc::new(Env::real()));
    let refresher = RetryingRefresher::new(settings.retry);

    let store = Arc::new(S3MappingStore::new(&settings.aws, refresher.clone()));
    let credentials = Arc::new(
        StsCredentialStep::new(runner.clone(), tokens.clone(), refresher)
            .with_audience(settings.aws.audience.clone()),
    );

    Pipeline::new(runner, tokens, store, credentials, settings)
}

async fn run(settings: Settings) -> ExitCode {
    match github_pipeline(settings).run().await {
        RunStatus::Succeeded(outcome) => {
            info!(mapping = %outcome.mapping, role_arn = %outcome.role_arn, "Run complete");
            ExitCode::SUCCESS
        }
        RunStatus::Failed(_) => ExitCode::FAILURE,
    }
}

fn cleanup(settings: Settings) -> Result<ExitCode, Box<dyn std::error::Error>> {
    github_pipeline(settings).cleanup()?;
    Ok(ExitCode::SUCCESS)
}

async fn resolve(
    settings: Settings,
    mappings: PathBuf,
    repository: String,
    git_ref: String,
    name: Option<String>,
    account: Option<String>,
    multi_account: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let (root, key) = split_path(&mappings)?;
    let location = serde_json::json!({
        "roleArn": "offline",
        "mappingBucket": "local",
        "mappingKey": key,
    });

    let mut runner = RecordingRunner::new()
        .with_context("workflow_dispatch", &repository, &git_ref)
        .with_input(CONFIG_INPUT, location.to_string())
        .with_input(MULTI_ACCOUNT_INPUT, multi_account.to_string());
    if let Some(name) = name {
        runner = runner.with_input(NAME_INPUT, name);
    }
    if let Some(account) = account {
        runner = runner.with_input(ACCOUNT_INPUT, account);
    }
    let runner = Arc::new(runner);
    let credentials = Arc::new(DryRunCredentialStep::new());

    let pipeline = Pipeline::new(
        runner.clone(),
        Arc::new(StaticToken::new("offline")),
        Arc::new(LocalMappingStore::new(root)),
        credentials.clone(),
        settings,
    );

    match pipeline.run().await {
        RunStatus::Succeeded(outcome) => {
            println!("Mapping:    {}", outcome.mapping);
            println!("Role ARN:   {}", outcome.role_arn);
            println!(
                "Account id: {}",
                outcome.account_id.as_deref().unwrap_or("-")
            );
            for params in credentials.assumed() {
                println!(
                    "Would assume {} in {} for {}s",
                    params.role_to_assume, params.region, params.role_duration_seconds
                );
            }
            for (name, value) in runner.exported() {
                println!("export {}={}", name, value);
            }
            for (name, value) in runner.outputs() {
                println!("output {}={}", name, value);
            }
            Ok(ExitCode::SUCCESS)
        }
        RunStatus::Failed(message) => {
            eprintln!("Error: {}", message);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn lint(path: &Path) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let content = tokio::fs::read(path).await?;
    let document: RepositoriesMappings = serde_json::from_slice(&content)?;
    let issues = mapping::lint(&document);

    if issues.is_empty() {
        println!(
            "{}: {} repositories, no issues",
            path.display(),
            document.len()
        );
        return Ok(ExitCode::SUCCESS);
    }

    for issue in &issues {
        println!("{}", issue);
    }
    println!("{} issue(s) found", issues.len());
    Ok(ExitCode::FAILURE)
}

/// Split a file path into the directory a local store reads from and the
/// key below it
fn split_path(path: &Path) -> Result<(PathBuf, String), Box<dyn std::error::Error>> {
    let key = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("Invalid mapping file path: {}", path.display()))?;
    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((root.to_path_buf(), key.to_string()))
}
