use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::deploy::OutputFormat;
use commands::render::{RenderFormat, RenderTarget};
use commands::ConfigArgs;

#[derive(Parser, Debug)]
#[command(
    name = "bqwatch",
    version,
    about = "Real-time BigQuery cost monitoring on Cloud Operations"
)]
struct Cli {
    /// Log at debug level. RUST_LOG takes precedence when set.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the metric, channel and policy if missing, then overwrite the dashboard.
    Deploy {
        #[command(flatten)]
        config: ConfigArgs,

        /// Look up existing resources but do not create or overwrite anything.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Do not fail the run when only the dashboard step fails.
        #[arg(long, default_value_t = false)]
        continue_on_dashboard_error: bool,

        /// Report format written to stdout.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Validate configuration and prerequisites without changing anything.
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the payload that would be submitted for one resource.
    Render {
        #[arg(value_enum)]
        target: RenderTarget,

        #[command(flatten)]
        config: ConfigArgs,

        #[arg(long, value_enum, default_value_t = RenderFormat::Json)]
        format: RenderFormat,
    },

    /// Write a starter configuration file.
    Init {
        #[arg(long, default_value = commands::DEFAULT_CONFIG_PATH)]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.cmd).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Deploy {
            config,
            dry_run,
            continue_on_dashboard_error,
            output,
        } => {
            commands::deploy::run(&config, dry_run, continue_on_dashboard_error, output).await
        }
        Command::Check { config } => commands::check::run(&config).await,
        Command::Render {
            target,
            config,
            format,
        } => commands::render::run(&config, target, format).await,
        Command::Init { path, force } => commands::init::run(&path, force),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
