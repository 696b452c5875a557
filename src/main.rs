use std::path::PathBuf;

use htserve::config::Config;
use htserve::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let cfg = Config::load(config_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(cfg.log_level()?)
        .init();

    tracing::info!(
        root = %cfg.static_files.root.display(),
        access_log = %cfg.logging.access_log.display(),
        idle_timeout_secs = cfg.server.idle_timeout_secs,
        "Starting server"
    );

    tokio::select! {
        res = server::listener::run(&cfg) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
