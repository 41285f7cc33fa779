use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use super::config::HostConfig;

pub(crate) struct AppWiring {
    pub(crate) config: HostConfig,
}

pub(crate) fn build_app() -> Option<AppWiring> {
    init_tracing();
    info!("=== Hellgate Host Startup ===");

    match HostConfig::load_from_env() {
        Ok((config, config_path)) => {
            info!(
                config = %config_path
                    .as_deref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "defaults".to_string()),
                textures = config.textures.len(),
                startup_commands = config.bridge.startup_commands.len(),
                "config_loaded"
            );
            Some(AppWiring { config })
        }
        Err(err) => {
            error!(error = %err, "config_load_failed");
            None
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
