//! # User-Auth Query Handler
//!
//! Consumes commands from the request topic, runs the registered action and
//! publishes the correlated result to the command's response topic.
//!
//! ## Startup Sequence
//!
//! 1. Load `.env` (if present) and initialize telemetry
//! 2. Load and validate configuration (fail fast)
//! 3. Connect the user store selected by `STORE_BACKEND` and apply the seed file
//! 4. Connect the Redis Streams transport and serve the admin endpoint
//! 5. Start the result publisher and query pipeline
//! 6. Consume until Ctrl-C closes the consumer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tracing::{error, info};

use qh_02_action_dispatch::{InMemoryUserStore, MongoUserStore, UserStore};
use query_runtime::{
    admin, config, seed, QueryRuntime, RuntimeConfig, RuntimeDeps, SeedTarget, StoreBackend,
    Transport,
};
use query_telemetry::{init_telemetry, TelemetryConfig};
use shared_bus::TransportError;

async fn apply_seed_file(store: &dyn SeedTarget, config: &RuntimeConfig) -> Result<()> {
    if let Some(path) = &config.user_seed_file {
        seed::seed_store(store, path)
            .await
            .with_context(|| format!("Failed to seed user store from {}", path.display()))?;
    }
    Ok(())
}

async fn open_store(config: &RuntimeConfig) -> Result<Arc<dyn UserStore>> {
    match config.store_backend {
        StoreBackend::Mongo => {
            let store = MongoUserStore::connect(&config.store)
                .await
                .context("Failed to connect MongoDB user store")?;
            apply_seed_file(&store, config).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            let store = InMemoryUserStore::connect(&config.store)
                .context("Failed to open in-memory user store")?;
            apply_seed_file(&store, config).await?;
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();
    let _telemetry =
        init_telemetry(&TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;
    dotenv.log();

    let config = RuntimeConfig::from_env().context("Invalid configuration")?;
    info!(
        service = %config.service_name,
        store = ?config.store_backend,
        "Starting query handler"
    );

    let store = open_store(&config).await?;
    let transport = Transport::redis_streams(&config.transport, config.result_queue_capacity)
        .await
        .context("Failed to connect message transport")?;

    let (stop_admin, admin_stopped) = watch::channel(false);
    if let Some(addr) = config.metrics_addr {
        let listener = admin::bind(addr)
            .await
            .with_context(|| format!("Failed to bind admin endpoint on {addr}"))?;
        let mut admin_stopped = admin_stopped.clone();
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = admin_stopped.wait_for(|stopped| *stopped).await;
            };
            if let Err(e) = admin::serve(listener, shutdown).await {
                error!(error = %e, "Admin endpoint failed");
            }
        });
    }

    let runtime = QueryRuntime::start(&config, transport, RuntimeDeps::new(store));

    let shutting_down = Arc::new(AtomicBool::new(false));
    {
        let consumer = runtime.consumer();
        let shutting_down = Arc::clone(&shutting_down);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received, closing consumer"),
                Err(e) => error!(error = %e, "Failed to listen for shutdown signal, closing consumer"),
            }
            shutting_down.store(true, Ordering::SeqCst);
            consumer.close();
        });
    }

    info!("Query handler running. Press Ctrl+C to stop.");
    let outcome = runtime.run().await;
    let _ = stop_admin.send(true);

    match outcome {
        Err(TransportError::ContextClosed) if shutting_down.load(Ordering::SeqCst) => {
            info!("Consumer closed, query handler stopped");
            Ok(())
        }
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "Consume loop terminated");
            bail!("consume loop terminated: {e}")
        }
    }
}
