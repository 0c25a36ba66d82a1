use anyhow::Result;
use tracing::info;

mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
mod server;

use infrastructure::logging::init_logging;
use infrastructure::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    init_logging(&settings.log_level)?;
    info!(driver = ?settings.database_driver, addr = %settings.http_addr, "starting content-server");

    let state = server::build_state(&settings).await?;
    server::run_http(&settings, state).await
}
