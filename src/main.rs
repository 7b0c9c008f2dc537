//! DolorFarma Dashboard - consultation database viewer
//!
//! Loads an uploaded SQLite extract, joins consultations to users and shows
//! descriptive charts.

mod charts;
mod config;
mod data;
mod gui;
mod session;

use eframe::egui;
use gui::DashboardApp;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 850.0])
            .with_min_inner_size([1000.0, 650.0])
            .with_title(config::APP_NAME),
        ..Default::default()
    };

    eframe::run_native(
        config::APP_NAME,
        options,
        Box::new(|cc| Ok(Box::new(DashboardApp::new(cc)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
