// epimesh - command line node
//
//   epimesh anti-entropy 5000 localhost:5001 localhost:5002
//   epimesh rumor 4000 localhost:4001 localhost:4002

use clap::{Args, Parser, Subcommand};
use epimesh::console::Console;
use epimesh::node::{Node, NodeConfig, NodeError, NodeHandle, Replica, Variant};
use epimesh::transport::{PeerAddress, UdpTransport};
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "epimesh", version, about = "Epidemic message replication over UDP")]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Periodic pairwise reconciliation of the full message set
    AntiEntropy(AntiEntropyArgs),
    /// Push gossip with bounded fan-out
    Rumor(RumorArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Port to listen on (variant default when omitted)
    port: Option<u16>,

    /// Initial peers as host:port
    peers: Vec<PeerAddress>,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Seed for peer selection
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct AntiEntropyArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Milliseconds between sync rounds
    #[arg(long, default_value_t = 5000)]
    interval_ms: u64,

    /// Also push new messages to every peer as soon as they are created
    #[arg(long)]
    broadcast: bool,
}

#[derive(Args, Debug)]
struct RumorArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Peers each rumor is forwarded to
    #[arg(long, default_value_t = 2)]
    fanout: usize,
}

impl Mode {
    fn into_config(self) -> NodeConfig {
        let (variant, common) = match &self {
            Mode::AntiEntropy(args) => (Variant::AntiEntropy, &args.common),
            Mode::Rumor(args) => (Variant::Rumor, &args.common),
        };

        let mut config = NodeConfig::new(variant)
            .with_bind_host(&common.bind)
            .with_peers(common.peers.iter().cloned())
            .with_seed(common.seed);
        if let Some(port) = common.port {
            config = config.with_port(port);
        }

        match self {
            Mode::AntiEntropy(args) => config
                .with_sync_interval(Duration::from_millis(args.interval_ms))
                .with_broadcast_on_originate(args.broadcast),
            Mode::Rumor(args) => config.with_fanout(args.fanout),
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli.mode.into_config()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "node failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: NodeConfig) -> Result<(), NodeError> {
    config.validate()?;
    let transport = UdpTransport::bind(config.transport_config()).await?;
    let port = transport.local_port();

    match config.variant {
        Variant::AntiEntropy => {
            let engine = config.build_anti_entropy(port);
            serve(spawn(engine, transport, &config)).await
        }
        Variant::Rumor => {
            let engine = config.build_rumor(port);
            serve(spawn(engine, transport, &config)).await
        }
    }
}

fn spawn<R: Replica>(
    replica: R,
    transport: UdpTransport,
    config: &NodeConfig,
) -> (NodeHandle, JoinHandle<R>) {
    Node::new(replica, transport)
        .with_buffers(config.command_buffer, config.datagram_buffer)
        .spawn()
}

/// Run the console on stdin, then keep serving peers until interrupted
async fn serve<R>((handle, _task): (NodeHandle, JoinHandle<R>)) -> Result<(), NodeError> {
    let mut console = Console::new(handle.clone(), tokio::io::stdout());
    let stdin = BufReader::new(tokio::io::stdin());

    if let Err(e) = console.print_banner().await {
        error!(error = %e, "console output failed");
    }
    if let Err(e) = console.run(stdin).await {
        error!(error = %e, "console input failed");
    }

    info!("console closed; node keeps running until interrupted");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for interrupt");
    }
    drop(handle);
    Ok(())
}
