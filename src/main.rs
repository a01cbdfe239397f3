use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voicebot::config::VoicebotConfig;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voicebot=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting interview assistant");

    let config = VoicebotConfig::load_default().context("failed to load configuration")?;

    // The controller and its requests live on the runtime; the window owns the main thread
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("voicebot-runtime")
        .build()
        .context("failed to start async runtime")?;

    let handle = {
        let _guard = runtime.enter();
        voicebot::integration::spawn(&config)?
    };

    voicebot::ui::run(handle).map_err(|e| anyhow::anyhow!("UI error: {}", e))?;

    // Let the controller finish its shutdown before the runtime goes away
    runtime.shutdown_timeout(std::time::Duration::from_secs(2));
    info!("Interview assistant exited");
    Ok(())
}
