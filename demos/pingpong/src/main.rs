//! Ping-pong demo server.
//!
//! Listens on `ws://0.0.0.0:3000/pingpong` unless overridden by
//! `courier.toml` or `COURIER__*` variables.

use std::sync::Arc;

use courier::config::ConfigLoader;
use pingpong::{PingPong, DEFAULT_REPING_DELAY};
use tracing::info;

// `courier.toml` and `COURIER__*` variables override only the keys they set.
const DEFAULTS: &str = r#"
[server]
path = "/pingpong"

[telemetry]
service_name = "pingpong"
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_string(DEFAULTS, "toml")?
        .with_optional_file("courier.toml")?
        .with_dotenv()?
        .with_default_env()
        .load()?;

    let server = courier::bootstrap(&config)?;
    server.register(Arc::new(PingPong::new(DEFAULT_REPING_DELAY)))?;

    info!(addr = %config.server.bind_addr, path = %config.server.path, "Starting pingpong");
    server.run().await?;
    Ok(())
}
