use chat_relay::config::RelayConfig;
use chat_relay::relay_state::RelayState;
use chat_relay::server;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "chat-relay", about = "Streaming relay for the chat widget")]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Overall upstream request timeout in seconds; bounds the whole
    /// streamed completion.
    #[arg(long, default_value_t = 600)]
    timeout: u64,

    /// Maximum inbound request body size in bytes.
    #[arg(long, default_value_t = 2 * 1024 * 1024)]
    max_payload_size: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = RelayConfig::from_env(args.host, args.port, args.timeout, args.max_payload_size);
    let relay_state = RelayState::new(config.clone())?;
    actix_web::rt::System::new().block_on(server::startup(config, relay_state))?;
    Ok(())
}
