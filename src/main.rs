//! Worker binary.
//!
//! Wires the Redis queue, the PostgreSQL ledger and the ffmpeg executor into a
//! dispatcher, then consumes until SIGINT/SIGTERM and drains in-flight jobs.
//!
//! Environment Variables: see `WorkerConfig` (`REDIS_URL`, `POSTGRES_*`,
//! `QUEUE_NAME`, `CONVERSION_EXCHANGE`, `CONVERSION_KEY`, `DEBUG`, ...).

use dashmill::adapters::ffmpeg::FfmpegExecutor;
use dashmill::adapters::postgres::PgLedgerStore;
use dashmill::adapters::redis::{RedisPool, RedisQueue};
use dashmill::{logging, Dispatcher, IdempotencyLedger, JobHandler, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    logging::init(config.debug);

    let store = match PgLedgerStore::connect(&config.postgres).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "failed to connect to PostgreSQL");
            std::process::exit(1);
        }
    };

    let redis = match RedisPool::new(&config.redis_url) {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "failed to create Redis pool");
            std::process::exit(1);
        }
    };
    if let Err(e) = redis.ping().await {
        error!(error = %e, "failed to connect to Redis");
        std::process::exit(1);
    }

    let queue = RedisQueue::new(redis, config.queue_key(), &config.consumer_name);
    match queue.requeue_stale().await {
        Ok(0) => {}
        Ok(n) => warn!(count = n, "requeued deliveries left by a previous run"),
        Err(e) => error!(error = %e, "failed to requeue stale deliveries"),
    }

    let handler = JobHandler::new(
        IdempotencyLedger::new(store),
        FfmpegExecutor::new(config.ffmpeg_bin.clone()),
    )
    .with_timeout(config.job_timeout);

    let dispatcher = Dispatcher::new(queue, handler)
        .with_max_in_flight(config.max_concurrent_jobs)
        .with_receive_timeout(config.dequeue_timeout_secs);

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    info!(queue = %config.queue_key(), consumer = %config.consumer_name, "waiting for messages");
    dispatcher.run(shutdown).await;
    info!("exiting");
}

async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received, finalizing processing");
    shutdown.cancel();
}
