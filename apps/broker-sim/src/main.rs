//! Broker Simulator Binary
//!
//! Wires the in-memory registries, lifecycle engine, and fulfillment
//! worker together, connects a demo session, seeds a few sample orders,
//! and works them until shutdown.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p broker-sim -- [config.yaml]
//! ```
//!
//! With no argument the simulator reads `config.yaml` from the working
//! directory and falls back to built-in defaults when it is absent.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use tokio::signal;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use broker_sim::config::{ConfigError, Settings, SimulatorConfig, load_config};
use broker_sim::domain::{ClientOrderId, Quantity, SessionId, Side};
use broker_sim::engine::{EngineError, FillWorker, LifecycleEngine, NewOrderRequest};
use broker_sim::feed::SyntheticPriceFeed;
use broker_sim::ports::{DeliveryContext, OutboundMessage};
use broker_sim::registry::{ActivityLog, ExecutionRegistry, OrderRegistry};
use broker_sim::transport::ChannelTransport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    tracing::info!("Starting broker simulator");

    let config = load_settings()?;
    let settings = Settings::new(config);
    log_settings(&settings);

    let (transport, outbound) = ChannelTransport::new();
    let engine = Arc::new(LifecycleEngine::new(
        Arc::new(OrderRegistry::new()),
        Arc::new(ExecutionRegistry::new()),
        Arc::new(ActivityLog::new()),
        Arc::new(transport),
        settings.clone(),
    ));
    let worker = FillWorker::new(Arc::clone(&engine));

    let shutdown = CancellationToken::new();
    let pump = start_outbound_pump(outbound, shutdown.clone());

    engine.on_connect(SessionId::new("FIX.4.2:CLIENT->SIM"));
    let price_source = Arc::new(SyntheticPriceFeed::new(settings.price_precision()));
    worker.start(settings.fill_delay(), settings.fill_partials(), price_source)?;

    seed_orders(&engine)?;

    tracing::info!("Simulator ready, Ctrl+C to stop");
    shutdown_signal().await;

    worker.stop().await;
    engine.on_disconnect();
    shutdown.cancel();
    if let Err(e) = pump.await {
        tracing::error!(error = %e, "Outbound pump join failed");
    }

    tracing::info!("Broker simulator stopped");
    Ok(())
}

/// Initialize the tracing subscriber with environment filter.
///
/// Uses static directive strings that are compile-time constants guaranteed to parse.
#[allow(clippy::expect_used)]
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "broker_sim=info"
                    .parse()
                    .expect("static directive 'broker_sim=info' is valid"),
            ),
        )
        .init();
}

/// Load configuration from the path given on the command line, or from
/// `config.yaml`, or fall back to defaults when neither exists.
fn load_settings() -> Result<SimulatorConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => load_config(Some(&path)),
        None => match load_config(None) {
            Ok(config) => Ok(config),
            Err(ConfigError::ReadError { path, .. }) => {
                tracing::info!(path = %path, "No config file found, using defaults");
                Ok(SimulatorConfig::default())
            }
            Err(e) => Err(e),
        },
    }
}

/// Log the effective configuration.
fn log_settings(settings: &Settings) {
    tracing::info!(
        price_precision = settings.price_precision(),
        fill_delay_ms = u64::try_from(settings.fill_delay().as_millis()).unwrap_or(u64::MAX),
        fill_partials = settings.fill_partials(),
        log_capacity = settings.log_capacity(),
        auto_acknowledge = settings.auto_acknowledge(),
        "Configuration loaded"
    );
}

/// Drain outbound messages onto the log, standing in for a wire session.
fn start_outbound_pump(
    mut outbound: UnboundedReceiver<(OutboundMessage, DeliveryContext)>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                delivery = outbound.recv() => {
                    match delivery {
                        Some((message, context)) => {
                            tracing::info!(
                                session = %context.session,
                                message = %message.summary(),
                                "Outbound"
                            );
                        }
                        None => break,
                    }
                }
                () = shutdown.cancelled() => break,
            }
        }
    })
}

/// Submit a few sample orders for the worker to fill.
fn seed_orders(engine: &LifecycleEngine) -> Result<(), EngineError> {
    let samples = [
        ("demo-1", "AAPL", Side::Buy, 100),
        ("demo-2", "MSFT", Side::Sell, 250),
        ("demo-3", "IBM", Side::Buy, 75),
    ];

    for (client_id, symbol, side, qty) in samples {
        engine.on_new_order(NewOrderRequest {
            client_order_id: ClientOrderId::new(client_id),
            symbol: symbol.to_string(),
            side,
            quantity: Quantity::from_i64(qty),
            security: None,
        })?;
    }
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
