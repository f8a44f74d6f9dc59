//! Chat demo server.
//!
//! Listens on `ws://0.0.0.0:3000/chat` unless overridden by `courier.toml`
//! or `COURIER__*` variables.

use std::sync::Arc;

use chat::ChatChannel;
use courier::config::ConfigLoader;
use tracing::info;

// `courier.toml` and `COURIER__*` variables override only the keys they set.
const DEFAULTS: &str = r#"
[server]
path = "/chat"

[telemetry]
service_name = "chat"
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
    server.register(Arc::new(ChatChannel::new()))?;

    info!(addr = %config.server.bind_addr, path = %config.server.path, "Starting chat");
    server.run().await?;
    Ok(())
}
