use anyhow::Result;
use sppu_core::Config;
use tracing::{info, warn};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs are optional; a broken log dir must not keep the TUI from starting
    if let Err(e) = logging::init() {
        eprintln!("Logging disabled: {}", e);
    }

    let config = Config::load().unwrap_or_else(|e| {
        warn!(target: "sppu", "Failed to load config, using defaults: {}", e);
        Config::default()
    });
    info!(target: "sppu", "Starting with model {}", config.model);

    let mut app = App::new(&config);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();
    let sender = events.sender();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event, &sender)?,
            None => break,
        }
    }

    info!(target: "sppu", "Shutting down");
    Ok(())
}
