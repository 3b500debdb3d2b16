//! Protogen
//!
//! Full-screen terminal frontend for the protein discovery agent backend.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the default backend (localhost:8000)
//! protogen
//!
//! # Point at another backend
//! PROTOGEN_HOST=lab-server PROTOGEN_PORT=9000 protogen
//!
//! # With logging (stdout belongs to the UI, so logs go to a file)
//! PROTOGEN_LOG=/tmp/protogen.log RUST_LOG=debug protogen
//! ```
//!
//! # Environment Variables
//!
//! - `PROTOGEN_HOST`: Agent backend host (default: localhost)
//! - `PROTOGEN_PORT`: Agent backend port (default: 8000)
//! - `PROTOGEN_LOG`: Log file path; logging is off when unset
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use std::io;

use anyhow::Context;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use discovery_core::HttpTransport;
use protogen_tui::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let mut terminal = setup_terminal()?;

    // The alternate screen must be left even when the app errors out,
    // or the shell comes back unusable.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        original_hook(info);
    }));

    let mut app = App::new(HttpTransport::from_env());
    let result = app.run(&mut terminal).await;

    restore_terminal()?;
    result
}

/// Route tracing to the file named by `PROTOGEN_LOG`; stdout is the UI's.
fn init_tracing() -> anyhow::Result<()> {
    let Ok(path) = std::env::var("PROTOGEN_LOG") else {
        return Ok(());
    };
    let file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create log file {path}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    io::stdout()
        .execute(EnterAlternateScreen)
        .context("failed to enter alternate screen")?;
    let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> anyhow::Result<()> {
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
