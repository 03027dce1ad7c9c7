//! StealthPad - stealthy always-on-top sticky notes for Windows
//!
//! One translucent, capture-excluded note window per note, a system tray
//! control surface, global shortcuts, and per-note geometry that survives
//! restarts.

#![windows_subsystem = "windows"]

mod app;
mod commands;
mod config;
mod display;
mod error;
mod hotkey;
mod store;
mod tray;
mod utils;
mod window;
mod zorder;

use anyhow::Result;
use log::{info, LevelFilter};
use std::sync::Arc;

use crate::app::Application;
use crate::config::Config;

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .format_timestamp_millis()
        .init();

    info!("Starting StealthPad v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(Config::load_or_default()?);
    info!("Configuration loaded successfully");

    let mut app = Application::new(config)?;
    app.run()?;

    info!("StealthPad shutting down gracefully");
    Ok(())
}
