//! Command implementations
//!
//! Every command walks the configured repository through the same
//! resilience executor and honours the process-wide cancellation token.

pub mod files;
pub mod letters;

use std::sync::Arc;

use clap::{Args, Subcommand};
use ghstat_core::{
    AllowedExtensions, CancellationToken, Config, RepoAnalyzer, RepoWalker, ResilienceExecutor,
};
use ghstat_github::GitHubClient;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Letter frequencies over the matching files of a repository
    Letters(letters::LettersArgs),

    /// List the matching files of a repository
    Files(files::FilesArgs),
}

/// Repository selection and traversal flags shared by all commands
#[derive(Args, Debug, Clone, Default)]
pub struct RepoArgs {
    /// File extensions to include (repeatable, defaults to .js and .ts)
    #[arg(short = 'e', long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Repository owner (overrides config)
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name (overrides config)
    #[arg(long)]
    pub repo: Option<String>,

    /// Maximum concurrent API calls (overrides config)
    #[arg(short = 'P', long)]
    pub parallel: Option<usize>,

    /// Process files as they arrive instead of fetching everything first
    #[arg(long)]
    pub stream: bool,
}

impl RepoArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(owner) = &self.owner {
            config.github.owner = owner.clone();
        }
        if let Some(repo) = &self.repo {
            config.github.repo = repo.clone();
        }
        if let Some(n) = self.parallel {
            config.traversal.parallelism = Some(n);
        }
    }

    /// Empty input means the default `.js`/`.ts` set
    pub fn allowed_extensions(&self) -> AllowedExtensions {
        AllowedExtensions::or_default(&self.extensions)
    }
}

/// Everything a command needs besides its own arguments
pub struct Context {
    pub config: Config,
    pub cancel: CancellationToken,
    pub output: OutputConfig,
}

pub async fn execute(command: Commands, ctx: Context) -> ExitCode {
    match command {
        Commands::Letters(args) => letters::execute(args, ctx).await,
        Commands::Files(args) => files::execute(args, ctx).await,
    }
}

/// Resolve the effective configuration and wire provider, executor and walker
pub fn build_analyzer(
    args: &RepoArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<(RepoAnalyzer, String), ExitCode> {
    let mut config = config.clone();
    args.apply(&mut config);

    if let Err(e) = config.validate() {
        formatter.error(&e.to_string());
        return Err(ExitCode::UsageError);
    }

    let client = match GitHubClient::new(&config.github) {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("Failed to create GitHub client: {e}"));
            return Err(ExitCode::from_error(&e));
        }
    };

    let executor = Arc::new(ResilienceExecutor::from_config(&config.resilience));
    let walker = RepoWalker::new(
        Arc::new(client),
        executor,
        config.traversal.walk_options(),
    );

    let repository = format!("{}/{}", config.github.owner, config.github.repo);
    tracing::debug!(
        repository = %repository,
        parallelism = walker.options().parallelism,
        "Analyzer ready"
    );
    Ok((RepoAnalyzer::new(walker), repository))
}
