//! pgpeek - browse, filter and export PostgreSQL tables from the terminal.

mod app;
mod commands;
mod prompt;
mod render;

use std::io::{self, IsTerminal};

use anyhow::Context;

use app::App;
use pgpeek_core::logging::init_logging_default;
use pgpeek_core::Session;
use prompt::Console;

fn main() -> anyhow::Result<()> {
    // Held until exit so buffered log lines are flushed
    let _logging_guard = init_logging_default();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting pgpeek");

    let session = Session::new().context("Failed to start session")?;

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let console = Console::new(stdin.lock(), io::stdout(), interactive);

    let mut app = App::new(session, console);
    let outcome = app.run();

    match &outcome {
        Ok(()) => tracing::info!("pgpeek exiting"),
        Err(e) => tracing::error!(error = %e, "pgpeek stopped on a terminal error"),
    }
    outcome
}
