use perception_overlay::capture::{CaptureSource, SyntheticCamera};
use perception_overlay::config::Configuration;
use perception_overlay::coordinator::CoordinatorBuilder;
use perception_overlay::error::AppError;
use perception_overlay::render::OverlayChannel;
use tokio_stream::StreamExt;
use tracing::{debug, info, Level};

const DEMO_FPS: u32 = 30;

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let configuration = Configuration::load()?;
    // validate() already rejected unknown levels
    init_logging(configuration.log_level.parse().unwrap_or(Level::INFO));

    let channel = OverlayChannel::new();
    let mut overlays = Box::pin(channel.subscribe().into_stream());
    let viewer = tokio::spawn(async move {
        while let Some(overlay) = overlays.next().await {
            debug!(
                frame_id = overlay.frame_id(),
                layers = overlay.layers.len(),
                focus = overlay.engagement.focus,
                "Overlay ready"
            );
        }
    });

    let mut coordinator = CoordinatorBuilder::new(configuration)
        .frame_source(Box::new(CaptureSource::new(Box::new(SyntheticCamera::new(
            DEMO_FPS,
        )))))
        .surface(Box::new(channel))
        .build()?;

    coordinator.start().await?;
    info!(session_id = %coordinator.session_id(), "Running, press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
    }

    coordinator.stop().await;
    // Dropping the coordinator closes the overlay channel, which ends the viewer.
    drop(coordinator);
    if let Err(e) = viewer.await {
        tracing::error!("Overlay viewer ended abnormally: {}", e);
    }
    Ok(())
}
