use anyhow::{Context, Result};
use dotenvy::dotenv;
use log::info;
use tokio::net::TcpListener;

use gymlog::config::Config;
use gymlog::db::connect;
use gymlog::logging::init_logger;
use gymlog_server::router;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::from_env()?;
    init_logger(config.log_level);

    let pool = connect(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, router(pool)).await?;
    Ok(())
}
