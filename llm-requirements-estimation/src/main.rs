mod commands;
mod estimate;
mod tui;
mod utils;

use std::error::Error;
use std::fs::File;
use std::process;

use clap::Parser;
use commands::{Cli, Commands};
use estimate::EstimateRequest;
use requirements_estimation::DataType;

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    init_logging(&cli)?;
    let settings = cli.settings();
    let runtime = tokio::runtime::Runtime::new()?;

    match &cli.command {
        Some(Commands::Estimate {
            model,
            dtype,
            users,
            context,
            estimate_kv: _,
            verbose,
        }) => {
            let dtype = match dtype.as_deref().map(DataType::normalize).transpose() {
                Ok(dtype) => dtype,
                Err(err) => {
                    eprintln!("Error: {err}");
                    eprintln!("Supported types: {}", DataType::ACCEPTED);
                    process::exit(1);
                }
            };
            let request = EstimateRequest {
                model: model.as_str(),
                dtype,
                users: *users,
                context_length: *context,
                verbose: *verbose,
            };
            runtime.block_on(estimate::run_estimate(&settings, &request))?;
        }
        Some(Commands::List { search }) => {
            runtime.block_on(estimate::run_list(&settings, search.as_deref()))?;
        }
        Some(Commands::Tui) => {
            tui::run(&settings, runtime.handle())?;
        }
        None => {
            eprintln!("No command provided. Use --help for more information.");
        }
    }

    Ok(())
}

/// Logs go to stderr, or to `--log-file` when given. The explorer owns the
/// terminal, so without a log file it logs nothing.
fn init_logging(cli: &Cli) -> Result<(), Box<dyn Error + Send + Sync>> {
    let tui = matches!(cli.command, Some(Commands::Tui));
    if tui && cli.log_file.is_none() {
        return Ok(());
    }

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = &cli.log_file {
        let file = File::create(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}
