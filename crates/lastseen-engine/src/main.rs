//! LastSeen processor binary.
//!
//! Keeps the most recent event per track and re-emits the whole cache on a
//! fixed cadence, with an optional daily cache clear.
//!
//! # Architecture
//!
//! ```text
//! NATS (inbound) --> intake --> Processor::process --> MostRecentCache
//!                                                           |
//!                          NATS (outbound) <-- replay worker
//! ```
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `lastseen-config.yaml` (or `LASTSEEN_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Validate the schedule; refuse to start on any violation
//! 4. Connect to NATS, build the outbound sink, subscribe to the inbound subject
//! 5. Start the processor (startup clear, daily timer, replay worker)
//! 6. Run intake until Ctrl-C, then shut the processor down and flush NATS

mod error;
mod intake;
mod nats_sink;

use std::path::PathBuf;

use lastseen_core::config::{ConfigError, LastSeenConfig};
use lastseen_core::processor::Processor;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::nats_sink::NatsEventSink;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "lastseen-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, NATS is unreachable, or
/// the processor refuses to start.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        processor = config.processor.id,
        nats_url = config.infrastructure.nats_url,
        inbound_subject = config.infrastructure.inbound_subject,
        "lastseen-engine starting"
    );

    let violations = config.schedule.validate();
    if !violations.is_empty() {
        for violation in &violations {
            error!(%violation, "invalid schedule configuration");
        }
        return Err(EngineError::from(ConfigError::Invalid { violations }).into());
    }

    let nats_url = &config.infrastructure.nats_url;
    let client = async_nats::connect(nats_url)
        .await
        .map_err(|e| EngineError::Nats {
            message: format!("failed to connect to {nats_url}: {e}"),
        })?;
    info!("NATS connection established");

    let outbound_subject = config
        .infrastructure
        .outbound_subject
        .clone()
        .unwrap_or_else(|| config.processor.event_destination());
    let sink = NatsEventSink::new(client.clone(), outbound_subject);
    info!(subject = sink.subject(), "outbound sink configured");

    let inbound_subject = config.infrastructure.inbound_subject.clone();
    let subscriber = client
        .subscribe(inbound_subject.clone())
        .await
        .map_err(|e| EngineError::Nats {
            message: format!("failed to subscribe to {inbound_subject}: {e}"),
        })?;
    info!(subject = inbound_subject, "subscribed to inbound events");

    let processor = Processor::new(config.processor.clone(), config.schedule.clone(), sink);
    processor.start().map_err(EngineError::from)?;
    info!(
        processor = %processor.identity().id,
        definition_uri = %processor.identity().definition_uri,
        "processor running"
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => warn!(error = %e, "failed to listen for shutdown signal"),
        }
        signal_cancel.cancel();
    });

    let accepted = intake::run_intake(subscriber, &processor, cancel).await;

    processor.shutdown().await;
    if let Err(e) = client.flush().await {
        warn!(error = %e, "failed to flush NATS on shutdown");
    }

    info!(
        accepted,
        cached = processor.cache().len(),
        "lastseen-engine shutdown complete"
    );
    Ok(())
}

/// Load configuration from `LASTSEEN_CONFIG` or `lastseen-config.yaml`.
///
/// Falls back to defaults when the file does not exist.
fn load_config() -> Result<LastSeenConfig, EngineError> {
    let path = std::env::var("LASTSEEN_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        Ok(LastSeenConfig::from_file(&path)?)
    } else {
        LastSeenConfig::parse("{}").map_err(EngineError::from)
    }
}
