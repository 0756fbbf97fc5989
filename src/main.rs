//! Purpose: `ykbridge` binary entry point: parse args, bootstrap, run the bridge.
//! Role: Keeps bootstrap out of the engine; the manifest gate runs before anything else.
//! Invariants: Process exit code is derived from `core::error::to_exit_code`.
//! Invariants: Transport failures after startup are logged, never fatal.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::aot::Shell;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ykbridge::core::capability::Capability;
use ykbridge::core::error::{Error, ErrorKind, to_exit_code};
use ykbridge::events;
use ykbridge::relay::{Bridge, CALLS_TOPIC};
use ykbridge::transport::Publish;
use ykbridge::transport::broker::{BrokerPublisher, BrokerSubscriber, DEFAULT_BROKER_URL};

mod config;

use config::BridgeConfig;

/// Buffered events per subscriber before the forwarder starts skipping.
const EVENT_QUEUE_DEPTH: usize = 256;

#[derive(Parser)]
#[command(
    name = "ykbridge",
    version,
    about = "Pub/sub RPC bridge exposing the platform capability tree to external callers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bridge against the configured broker.
    Run(RunArgs),
    /// Generate shell completion scripts.
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Print the version.
    Version,
}

#[derive(Args)]
struct RunArgs {
    /// Broker endpoint url.
    #[arg(long, env = "REDIS_URL", default_value = DEFAULT_BROKER_URL)]
    broker_url: String,

    /// Externally-mounted platform manifest; the bridge refuses to start
    /// without it.
    #[arg(long, default_value = "root-manifest.json", value_hint = ValueHint::FilePath)]
    manifest: PathBuf,
}

fn main() {
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    match cli.command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "ykbridge", &mut io::stdout());
            Ok(())
        }
        Command::Version => {
            println!("ykbridge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Run(args) => {
            let config = BridgeConfig::load(args.broker_url, args.manifest)?;
            init_tracing();
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve_bridge(config));
            Ok(())
        }
    }
}

/// Wire the publisher, event forwarder, and call handler, then park on the
/// shutdown signal. Transport setup failures leave the process running inert,
/// which is observable as "no responses are ever emitted".
async fn serve_bridge(config: BridgeConfig) {
    info!(
        "ykbridge {} starting against {}",
        env!("CARGO_PKG_VERSION"),
        config.broker_url
    );
    info!("using platform manifest {}", config.manifest.display());

    let (events_tx, events_rx) = tokio::sync::broadcast::channel(EVENT_QUEUE_DEPTH);
    let root = Arc::new(diagnostic_root());

    match BrokerPublisher::connect(&config.broker_url).await {
        Ok(publisher) => {
            let publisher: Arc<dyn Publish> = Arc::new(publisher);
            tokio::spawn(events::forward_events(Arc::clone(&publisher), events_rx));
            match subscribe_calls(&config.broker_url).await {
                Ok(subscriber) => {
                    let bridge = Bridge::new(root, publisher);
                    tokio::spawn(async move { bridge.run(subscriber).await });
                    info!("subscribed to {CALLS_TOPIC}");
                }
                Err(err) => error!("failed to subscribe to {CALLS_TOPIC}: {err}"),
            }
        }
        Err(err) => error!("failed to connect result publisher: {err}"),
    }

    shutdown_signal().await;
    info!("shutting down");
    drop(events_tx);
}

async fn subscribe_calls(broker_url: &str) -> Result<BrokerSubscriber, Error> {
    let mut subscriber = BrokerSubscriber::connect(broker_url).await?;
    subscriber.subscribe(CALLS_TOPIC).await?;
    Ok(subscriber)
}

/// Built-in surface for standalone runs. An embedding bot swaps this for its
/// own tree via `ykbridge::relay::Bridge` and feeds real platform events into
/// the broadcast channel.
fn diagnostic_root() -> Capability {
    Capability::object([(
        "bridge",
        Capability::object([
            (
                "ping",
                Capability::method(|_args| std::future::ready(Ok(json!("pong")))),
            ),
            (
                "version",
                Capability::method(|_args| {
                    std::future::ready(Ok(json!(env!("CARGO_PKG_VERSION"))))
                }),
            ),
        ]),
    )])
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

fn emit_error(err: &Error) {
    eprintln!("error: {err}");
    if let Some(hint) = err.hint() {
        eprintln!("hint: {hint}");
    }
}
