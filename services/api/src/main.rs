use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use api::{AppConfig, AppState, create_router, sweeper};
use common::ScratchDir;
use media::Toolchain;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    info!("Starting Sticker Forge API service");

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    config.validate()?;

    let scratch = ScratchDir::open(&config.scratch_dir)?;

    let toolchain = match Toolchain::locate(
        config.ffmpeg_path.as_deref(),
        config.ffprobe_path.as_deref(),
        config.tool_timeout(),
    ) {
        Ok(tools) => Some(tools),
        Err(e) => {
            warn!("{}; conversion and editing endpoints are disabled", e);
            None
        }
    };

    let _sweeper = sweeper::start_sweeper(
        scratch.clone(),
        &config.sweep_schedule,
        config.stale_after(),
    )
    .await?;

    let address = config.bind_address();
    let app = create_router(AppState::new(config, scratch, toolchain));

    let listener = TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
