//! PeerDrop relay server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin peerdrop-server
//! cargo run --bin peerdrop-server -- --host 127.0.0.1 --port 9000
//! PEERDROP_PORT=9000 RUST_LOG=peerdrop=debug cargo run --bin peerdrop-server
//! ```

use clap::Parser;
use peerdrop::logger::setup_logger;
use peerdrop::{PeerdropServer, ServerConfig};
use peerdrop_transport::DEFAULT_MAX_MESSAGE_SIZE;

#[derive(Parser, Debug)]
#[command(name = "peerdrop-server")]
#[command(about = "Relay that streams files between browser peers through short-lived rooms", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "PEERDROP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PEERDROP_PORT", default_value_t = 8080)]
    port: u16,

    /// HTTP path upgraded to the message socket
    #[arg(long, default_value = "/ws")]
    path: String,

    /// Largest inbound message accepted, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: format!("{}:{}", self.host, self.port),
            path: self.path,
            max_message_size: self.max_message_size,
        }
    }
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let config = Args::parse().into_config();
    tracing::info!(addr = %config.bind_addr, path = %config.path, "starting relay");

    let server = match PeerdropServer::builder().config(config).build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = server.run_until(shutdown).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
