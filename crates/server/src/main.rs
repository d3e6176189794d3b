//! Place Server - HTTP REST API for the collaborative canvas
//!
//! Exits non-zero when configuration is invalid or the square store or
//! canvas cache cannot be reached at startup.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;

    server::start_server(config).await?;

    Ok(())
}
