//! Needle-guidance template server
//!
//! ```bash
//! igtl-template-server 18944
//! RUST_LOG=igtl_template_server=debug igtl-template-server 18944
//! ```

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use igtl_template_server::config::ServerConfig;
use igtl_template_server::template::serve;
use igtl_template_server::Result;

/// OpenIGTLink server snapping navigation targets to template holes
#[derive(Debug, Parser)]
#[command(name = "igtl-template-server", version, about)]
struct Args {
    /// TCP port to listen on
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = ServerConfig::with_port(args.port).host(args.host);
    info!(
        addr = %config.bind_addr(),
        window_secs = config.total_accept_window().as_secs(),
        "Starting template server"
    );

    let dispatcher = serve(&config).await?;

    if let Some(selected) = dispatcher.last_selection() {
        info!(
            row = selected.index.row,
            column = selected.index.column,
            depth = selected.depth,
            "Last target"
        );
    }
    Ok(())
}
