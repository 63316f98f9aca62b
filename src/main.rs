use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod catalog;
mod cli;
mod config;
mod eid;
mod seed;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use config::Config;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = cli::Args::parse();

    let config = Config::load()?;
    log::debug!("config: {config:?}");

    // the blocking http client has to be built outside of the async runtime
    let app = app::App::new(config)?;

    match args.command {
        cli::Command::Daemon {} => {
            log::info!("embedding provider: {}", app.provider_name());
            if app.config().seed_on_startup {
                app.seed_if_empty()?;
            }
            web::start_daemon(app)
        }
        command => cli::run(&app, command),
    }
}
