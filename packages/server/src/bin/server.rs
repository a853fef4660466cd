//! Shoutout broadcast hub.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin shoutout-server
//! cargo run --bin shoutout-server -- --host 0.0.0.0 --port 3001 --invite-codes welcome
//! ```

use std::path::PathBuf;

use clap::Parser;
use shoutout_server::{
    config::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TOKENS_FILE, HubConfig},
    ui::Server,
};
use shoutout_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "shoutout-server")]
#[command(about = "Real-time broadcast hub for hamsters, toasts and reactions", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Shared secret accepted until the first invite code or token exists
    #[arg(long, env = "BROADCAST_SECRET", default_value = "change-me")]
    broadcast_secret: String,

    /// Accept every connection without credentials (insecure)
    #[arg(long, env = "ALLOW_NO_AUTH")]
    allow_no_auth: bool,

    /// Credential for the token administration routes
    #[arg(long, env = "ADMIN_TOKEN")]
    admin_token: Option<String>,

    /// Comma-separated invite codes that can be exchanged for tokens
    #[arg(long, env = "INVITE_CODES", value_delimiter = ',')]
    invite_codes: Vec<String>,

    /// JSON file holding issued tokens
    #[arg(long, env = "TOKENS_FILE", default_value = DEFAULT_TOKENS_FILE)]
    tokens_file: PathBuf,

    /// Append one line per HTTP broadcast to this file
    #[arg(long, env = "BROADCAST_LOG")]
    broadcast_log: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl From<Args> for HubConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            broadcast_secret: Some(args.broadcast_secret),
            allow_no_auth: args.allow_no_auth,
            admin_token: args.admin_token,
            invite_codes: args.invite_codes,
            tokens_file: args.tokens_file,
            broadcast_log: args.broadcast_log,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger("shoutout_server", env!("CARGO_BIN_NAME"), &args.log_level);

    let server = Server::new(HubConfig::from(args));
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
