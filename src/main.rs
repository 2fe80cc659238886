mod app;
mod cli;
mod config;
mod consts;
mod core;
mod error;
mod logging;
mod output;
mod source;
mod utils;

use chrono::Utc;
use clap::Parser;

use app::{CommandContext, handle_view};
use cli::{Cli, ReportView};
use config::{Config, EnvOverrides, Settings};
use error::AppError;
use source::{build_report, select_backend};
use utils::resolve_window;

fn run(cli: &Cli, settings: &Settings) -> Result<(), AppError> {
    let window = resolve_window(
        cli.start_ms.as_deref(),
        cli.end_ms.as_deref(),
        cli.last,
        Utc::now().timestamp_millis(),
    );
    tracing::debug!(start_ms = window.start_ms, end_ms = window.end_ms, "report window");

    let backend = select_backend(settings)?;
    let report = build_report(backend.as_ref(), window)?;

    let ctx = CommandContext {
        cli,
        report: &report,
    };
    handle_view(ReportView::from(&cli.command), &ctx)
}

fn main() {
    let loaded = Config::load();
    let cli = Cli::parse().with_config(&loaded.config);

    logging::init_logging(cli.debug, cli.use_color());
    loaded.log();

    let settings = Settings::resolve(&loaded.config, &EnvOverrides::from_env(), cli.flag_overrides());
    tracing::debug!(
        data_dir = %settings.data_dir.display(),
        backend = ?settings.backend,
        "resolved settings"
    );

    if let Err(e) = run(&cli, &settings) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
