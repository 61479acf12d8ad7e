//! StrainSense - Wearable Strain Sensor Workout Tracker
//!
//! Main entry point for the application.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting StrainSense v{}", env!("CARGO_PKG_VERSION"));

    let app = app::StrainSenseApp::new()?;
    app.run().await
}
