use std::fs::{self, File};
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use riot_core::{Config, TelemetryClient};

/// The terminal belongs to the UI, so logs go to `<cache>/riot/riot.log`
fn init_logging() {
    let filter = EnvFilter::try_from_env("RIOT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(dir) = dirs::cache_dir().map(|d| d.join("riot")) else {
        return;
    };
    let file = fs::create_dir_all(&dir).and_then(|_| File::create(dir.join("riot.log")));

    match file {
        Ok(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init();
        }
        Err(err) => eprintln!("log_file_error: {err}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::load()?;
    tracing::info!(
        api_url = config.api_url(),
        model = config.gemini().model.as_str(),
        api_key = %config.gemini().redacted_key(),
        "starting"
    );

    // Start-up reachability log only; the poller reports ongoing failures itself
    let backend = TelemetryClient::new(config.api_url());
    tokio::spawn(async move {
        match backend.health().await {
            Ok(health) => tracing::info!(
                status = %health.status,
                animals = health.animals_count,
                herds = health.herds_count,
                "backend reachable"
            ),
            Err(err) => tracing::warn!("backend health check failed: {}", err),
        }
    });

    let mut app = App::new(&config)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new(app.subscribe_feed());

    let result = run(&mut app, &mut terminal, &mut events).await;

    app.shutdown();
    tui::restore()?;
    result
}

async fn run(app: &mut App, terminal: &mut tui::Tui, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}
