use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use dev_workspace::commands::{self, SetupOptions};
use dev_workspace::{logging, LogLevel, Workspace, WorkspaceOptions};

/// Multi-repository workspace manager
#[derive(Parser)]
#[command(name = "kws")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (silly, verbose, info, warn, error, silent)
    #[arg(long, global = true, env = "KWS_LOGLEVEL", default_value = "info")]
    loglevel: LogLevel,

    /// Directory to start the search for kaltura-ws.json from
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,

    /// Engine home where lerna.json is generated (defaults to the executable's directory)
    #[arg(long, global = true, env = "KWS_HOME")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve repositories and regenerate lerna.json
    Sync,
    /// Setup dev environment
    Setup {
        /// Delete node_modules of packages before running the setup
        #[arg(long)]
        clean: bool,
        /// Skip building packages once setup is completed
        #[arg(long)]
        no_build: bool,
    },
    /// Remove the node_modules directory from all packages
    Clean,
    /// Link workspace libraries locally
    NpmLink,
    /// Run an npm script in each package that contains that script
    Run {
        script: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Git checkout to specified bookmark
    Bookmark {
        name: String,
        /// Update bookmark commit id to the latest commit
        #[arg(long)]
        update: bool,
    },
}

fn default_home() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the kws executable")?;
    exe.parent()
        .map(PathBuf::from)
        .context("kws executable has no parent directory")
}

async fn run(cli: Cli) -> Result<()> {
    let start_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let home = match cli.home {
        Some(home) => home,
        None => default_home()?,
    };

    let options = WorkspaceOptions::new(start_dir, home).with_log_level(cli.loglevel);
    let mut workspace = Workspace::open(options).await?;

    match cli.command {
        Commands::Sync => commands::sync(&workspace).print(),
        Commands::Setup { clean, no_build } => {
            commands::setup(
                &workspace,
                SetupOptions {
                    clean,
                    build: !no_build,
                },
            )
            .await?
        }
        Commands::Clean => {
            commands::clean(&workspace).await?;
        }
        Commands::NpmLink => commands::npm_link(&workspace).await?,
        Commands::Run { script, args } => commands::run_script(&workspace, &script, &args).await?,
        Commands::Bookmark { name, update } => {
            commands::bookmark(&mut workspace, &name, update)
                .await?
                .print();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.loglevel);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
