mod args;
use args::{parse_args, Commands};

mod core;

use common::rpc::default_socket_path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = parse_args();
    let socket = args.socket.unwrap_or_else(default_socket_path);

    match args.command {
        Commands::Status => core::status(&socket).await?,
    }

    Ok(())
}
