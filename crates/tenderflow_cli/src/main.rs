mod commands;

use anyhow::Result;
use clap::Parser;
use commands::run::{EXIT_FATAL, EXIT_OK};
use tenderflow_logging::LogConfig;
use tenderflow_schema::RunContext;

/// Ingests JSONL procurement data into a dynamically inferred relational
/// schema.
#[derive(Parser, Debug)]
#[command(name = "tenderflow", version, about)]
struct Cli {
    /// Run ingestion over JSON_BASE_PATH.
    #[arg(long)]
    run: bool,

    /// Print the processed-files ledger summary.
    #[arg(long)]
    status: bool,

    /// Interactively clear ledger entries.
    #[arg(long)]
    reset: bool,

    /// Open the interactive menu.
    #[arg(long)]
    menu: bool,

    /// Mirror full log output to stderr instead of warnings only.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            EXIT_FATAL
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    let ctx = RunContext::from_env()?;

    let _log_guard = tenderflow_logging::init_logging(LogConfig {
        log_path: &ctx.log_path,
        verbose: cli.verbose,
    })?;

    if cli.menu {
        return commands::menu::execute(&ctx).await;
    }
    if cli.status {
        commands::status::execute(&ctx).await?;
        return Ok(EXIT_OK);
    }
    if cli.reset {
        commands::reset::execute(&ctx).await?;
        return Ok(EXIT_OK);
    }
    if cli.run {
        return commands::run::execute(&ctx).await;
    }

    eprintln!("no action requested; pass --run, --status, --reset, or --menu");
    Ok(EXIT_OK)
}
