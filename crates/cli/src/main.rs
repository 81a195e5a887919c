use crate::{args::Args, error::CliError, shutdown::ShutdownCoordinator};
use clap::Parser;
use connectors::{rethinkdb::RethinkConnector, store::StoreConnector};
use engine_runtime::execution::{executor, preflight};
use shutdown::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod args;
mod error;
mod output;
mod shutdown;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let code = match import(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn import(args: Args) -> Result<ExitCode, CliError> {
    let settings = args.settings();
    settings.validate()?;
    let mut plan = args.plan()?;
    if plan.is_empty() {
        info!("No files to import");
        return Ok(ExitCode::Success);
    }

    let connector: Arc<dyn StoreConnector> = Arc::new(RethinkConnector::new(
        settings.target.host.clone(),
        settings.target.port,
        settings.auth_key.clone(),
    ));
    preflight::prepare(plan.specs_mut(), connector.as_ref(), settings.upsert).await?;

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let outcome = executor::run(plan.into_specs(), &settings, connector, shutdown.cancel_token()).await?;
    Ok(output::print_outcome(&outcome))
}
