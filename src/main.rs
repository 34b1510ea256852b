mod channel;
mod cli;
mod client;
mod host;
mod ipc;
mod native;
mod platform;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { socket, clipboard } => {
            let config = match host::HostConfig::resolve(socket, clipboard) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("platformd serve: {e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = host::run(config).await {
                tracing::error!(error = %e, "host failed");
                eprintln!("platformd serve: {e}");
                std::process::exit(1);
            }
        }
        Command::Call {
            method,
            args,
            socket,
        } => {
            if let Err(e) = client::run(socket, method, args).await {
                tracing::error!(error = %e, "call failed");
                eprintln!("platformd call: {e}");
                std::process::exit(1);
            }
        }
    }
}
