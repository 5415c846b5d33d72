mod config;
mod coordinator;
mod host;
mod x11;

use config::{Config, LoadOutcome};
use coordinator::FullscreenWorkspaceCoordinator;
use host::HostError;
use simplelog::{
    ColorChoice, CombinedLogger, Config as LogConfig, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use x11::X11Host;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, load_outcome) = Config::load();

    CombinedLogger::init(vec![
        TermLogger::new(
            config.level_filter(),
            LogConfig::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(
            config.level_filter(),
            LogConfig::default(),
            File::create(&config.log_file)?,
        ),
    ])?;

    match &load_outcome {
        LoadOutcome::FromFile(path) => log::info!("Loaded config from {:?}", path),
        LoadOutcome::Missing(path) => {
            log::info!("Config not found at {:?}, using defaults", path)
        }
        LoadOutcome::ParseError(path, e) => {
            log::error!("Failed to parse config at {:?}, using defaults: {}", path, e)
        }
    }

    let mut host = X11Host::connect()?;
    let mut coordinator = FullscreenWorkspaceCoordinator::new(config);
    coordinator.enable(&mut host)?;

    log::info!(
        "FOCUSMODE STARTED, tracking {} windows",
        coordinator.tracked_count()
    );

    // One serialized queue: every handler runs to completion before the
    // next event is pulled.
    loop {
        match host.next_event() {
            Ok(event) => coordinator.handle_event(&mut host, event),
            Err(HostError::Connection(e)) => {
                log::error!("X11 connection lost: {}", e);
                break;
            }
            Err(e) => log::warn!("Dropping undeliverable event: {}", e),
        }
    }

    // Best effort; the connection is usually already gone at this point.
    coordinator.disable(&mut host);
    Ok(())
}
