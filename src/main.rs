mod app;
mod components;
mod config;
mod error;
mod event;
mod handler;
mod org;
mod theme;
mod tui;
mod ui;
mod watch;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use crate::app::App;
use crate::config::AppConfig;
use crate::event::{Event, EventHandler};
use crate::org::payload::OrgListing;
use crate::tui::{install_panic_hook, Tui};
use crate::watch::PayloadWatcher;

/// A terminal browser for hierarchical organization listings.
#[derive(Parser, Debug)]
#[command(name = "orgtree", version, about)]
struct Cli {
    /// Organization listing JSON file (overrides config)
    path: Option<PathBuf>,

    /// Config file to use instead of the default locations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Color scheme: dark, light, custom
    #[arg(long)]
    theme: Option<String>,

    /// Disable the payload watcher (auto-reload)
    #[arg(long)]
    no_watch: bool,
}

/// Read and parse the listing file.
fn read_listing(path: &Path) -> error::Result<OrgListing> {
    let content = std::fs::read_to_string(path)?;
    OrgListing::from_json(&content)
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = AppConfig {
        theme: config::ThemeConfig {
            scheme: cli.theme.clone(),
            custom: None,
        },
        ..Default::default()
    };
    let app_config = AppConfig::load(cli.config.as_deref(), Some(&cli_overrides));

    let payload_path = cli
        .path
        .or_else(|| app_config.payload().map(PathBuf::from))
        .ok_or_else(|| {
            error::AppError::InvalidPath(
                "no listing file given (pass a path or set general.payload in the config)"
                    .to_string(),
            )
        })?;
    let payload_path = payload_path.canonicalize().map_err(|_| {
        error::AppError::InvalidPath(format!("{} does not exist", payload_path.display()))
    })?;

    let listing = read_listing(&payload_path)?;
    let theme = theme::resolve_theme(&app_config.theme);

    install_panic_hook();

    let mut tui = Tui::new()?;
    let mut app = App::new(&listing, payload_path.clone(), &app_config, theme)?;
    let mut events = EventHandler::new(Duration::from_millis(16));
    let event_tx = events.sender();

    // Fetch sequence counter shared with the watcher and the reload key
    let fetch_seq = Arc::new(AtomicU64::new(0));

    // Initialize payload watcher (unless disabled)
    let _watcher = if cli.no_watch || !app_config.watcher_enabled() {
        app.watcher_active = false;
        None
    } else {
        match PayloadWatcher::new(
            &payload_path,
            Duration::from_millis(app_config.debounce_ms()),
            Arc::clone(&fetch_seq),
            event_tx.clone(),
        ) {
            Ok(watcher) => {
                app.watcher_active = true;
                Some(watcher)
            }
            Err(e) => {
                app.watcher_active = false;
                app.set_status_message(format!("⚠ Watcher unavailable: {}", e));
                None
            }
        }
    };

    loop {
        tui.terminal_mut().draw(|frame| {
            ui::render(&mut app, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key, &event_tx, &fetch_seq),
            Event::Tick => app.clear_expired_status(),
            Event::Resize(_, _) => {}
            Event::PayloadChange(seq) => {
                // Skip the disk read when a newer fetch has already landed
                if seq > app.engine.last_applied_seq() {
                    match read_listing(&payload_path) {
                        Ok(listing) => app.reload(seq, &listing),
                        Err(e) => {
                            app.set_status_message(format!("Reload failed: {}", e));
                        }
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;
    Ok(())
}
