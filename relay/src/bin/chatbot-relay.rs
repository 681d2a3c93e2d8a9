use chatbot_relay::config::{default_config_file, RelayConfig};
use chatbot_relay::http_server;
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chatbot-relay", about = "Relay chat requests to the generative-language API")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API credential (prefer the API_KEY environment variable)
    #[arg(short = 'k', long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name injected into the upstream URL
    #[arg(short = 'm', long, env = "MODEL")]
    model: Option<String>,

    /// Upstream API base URL
    #[arg(long, env = "API_BASE")]
    api_base: Option<String>,

    /// Interface to bind
    #[arg(long, env = "HOST")]
    host: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Maximum accepted request body in bytes
    #[arg(long)]
    body_limit: Option<usize>,

    /// Log level used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn to_config(&self) -> RelayConfig {
        RelayConfig {
            api_key: self.api_key.clone().filter(|k| !k.is_empty()),
            model: self.model.clone().filter(|m| !m.is_empty()),
            api_base: self.api_base.clone(),
            host: self.host,
            port: self.port,
            body_limit_bytes: self.body_limit,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Make .env values visible to clap's env fallbacks
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_file()?,
    };
    let file_config = RelayConfig::load_from_file(&config_path)?;
    let config = file_config.merge(&args.to_config());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting chat relay");
    debug!(?config, path = %config_path.display(), "Resolved configuration");

    http_server::run_server(config.clone(), config.addr()).await?;

    info!("Chat relay shutting down");
    Ok(())
}
