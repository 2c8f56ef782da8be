//! canproxy: CAN console to stdin/stdout bridge.
//!
//! ```bash
//! canproxy --interface socketcan --channel can0 --bitrate 500
//! ```
//!
//! Bytes read from stdin go to the device; device console output comes out
//! on stdout. Logs go to stderr. Stop with Ctrl-C.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use cc16_console::bridge::{BridgeConfig, ConsoleBridge, StdinSource, DEFAULT_BITRATE_KBPS};
use cc16_console::core::logging::{init_tracing, FrameTracer};
use cc16_console::Result;

/// CAN console proxy
#[derive(Parser, Debug)]
#[command(name = "canproxy", version, about, long_about = None)]
struct Cli {
    /// CAN interface type (socketcan, virtual)
    #[arg(long, value_name = "INTERFACE")]
    interface: String,

    /// Interface channel (e.g. can0; defaults to can0 on socketcan)
    #[arg(long, value_name = "CHANNEL", default_value = "")]
    channel: String,

    /// CAN bitrate in kbit/s
    #[arg(long, value_name = "BITRATE_KBPS", default_value_t = DEFAULT_BITRATE_KBPS)]
    bitrate: u32,

    /// Stdin and bus polling interval in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1)]
    poll_interval_ms: u64,

    /// Increase log verbosity (-v info, -vv debug, -vvv frame trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("canproxy: {}", e);
        return ExitCode::FAILURE;
    }

    match proxy(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("canproxy: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn proxy(cli: Cli) -> Result<()> {
    let config = BridgeConfig::new(cli.interface)
        .with_channel(cli.channel)
        .with_bitrate_kbps(cli.bitrate)
        .with_poll_interval(Duration::from_millis(cli.poll_interval_ms));

    let bus = cc16_console::bus::open(&config)?;

    let mut bridge = ConsoleBridge::new(config, bus);
    bridge.forward_to(std::io::stdout());
    bridge.add_listener(Arc::new(FrameTracer));

    let result = bridge
        .run(StdinSource::new()?, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    let diag = bridge.diagnostics();
    tracing::info!(
        bus = %diag.bus,
        received = diag.read_count,
        sent = diag.write_count,
        errors = diag.error_count,
        "Console bridge finished"
    );

    result
}
