use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use redfishd_core::ServiceConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::load(None);
    if let Err(e) = std::fs::create_dir_all(&config.persistent_dir) {
        warn!(dir = %config.persistent_dir.display(), error = %e,
              "persistent directory unavailable, state will not survive restarts");
    }

    let (mut app, _state) = redfishd::build_app(config);
    app.validate();
    info!(
        routes = app.routes("/").len(),
        "redfishd starting"
    );

    if let Err(e) = app.run().await {
        error!(error = %e, "server exited with an error");
        std::process::exit(1);
    }
}
