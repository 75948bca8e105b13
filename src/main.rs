//! COVID-19 Dashboard - Time-series charts of confirmed cases and deaths
//!
//! Fetches the JHU CSSE time series, caches the merged table on disk and
//! shows per-region charts with policy event markers.

mod charts;
mod config;
mod data;
mod gui;
mod stats;

use anyhow::Context;
use config::DashboardConfig;
use data::{CachePolicy, CsvSource, DataCache, DirectoryCsvSource, HttpCsvSource, PolicyEvents, SnapshotStore};
use eframe::egui;
use gui::DashboardApp;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "covid_dashboard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DashboardConfig::from_env().context("Invalid configuration")?;

    let source: Arc<dyn CsvSource> = match &config.data_dir {
        Some(dir) => Arc::new(DirectoryCsvSource::new(dir)),
        None => Arc::new(
            HttpCsvSource::new(config.base_url.clone(), config.fetch_timeout)
                .context("Failed to build HTTP client")?,
        ),
    };
    tracing::info!(
        source = %source.describe(),
        snapshot = %config.snapshot_path.display(),
        "Starting dashboard"
    );

    let events = match &config.policy_events_path {
        Some(path) => PolicyEvents::load(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, path = %path.display(), "Policy events unavailable");
            PolicyEvents::empty()
        }),
        None => PolicyEvents::empty(),
    };
    if events.is_empty() {
        tracing::info!("No policy events loaded, only holiday markers are available");
    }

    let cache = Arc::new(DataCache::new(
        source,
        SnapshotStore::new(&config.snapshot_path),
        CachePolicy::new(config.snapshot_max_age),
    ));

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("COVID-19 Dashboard"),
        ..Default::default()
    };

    let default_country = config.default_country.clone();
    let refresh_interval = config.refresh_interval;
    eframe::run_native(
        "COVID-19 Dashboard",
        options,
        Box::new(move |cc| {
            Ok(Box::new(DashboardApp::new(
                cc,
                cache,
                events,
                &default_country,
                refresh_interval,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {}", e))?;

    Ok(())
}
