//! orchestrated-ping
//!
//! ```text
//!   client ──▶ net::connection ──▶ http::server (middleware stack) ──▶ handlers
//!                                        │
//!                                        ├─▶ observability::logging ──▶ stdout (ECS JSON)
//!                                        └─▶ observability::metrics ──▶ GET /metrics
//!
//!   lifecycle: config ─▶ startup ─▶ server (accept loop) ◀── signals
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Parser)]
#[command(name = "orchestrated-ping")]
#[command(version, about = "Ping service with ECS logs and Prometheus metrics", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Environment variables override it.
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    orchestrated_ping::lifecycle::startup::run(cli.config.as_deref()).await
}
