//! Process entry point: load configuration, wire the cache/resolver/server
//! stack together, run until a shutdown signal arrives.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use rdns::cache::{spawn_sweep_task, CacheConfig, CacheEngine};
use rdns::cli::Cli;
use rdns::config::ConfigFile;
use rdns::error::ResolverError;
use rdns::resolver::Resolver;
use rdns::server::{serve_tcp, serve_udp, ConcurrencyLimiter, RateLimiter, ServerContext};
use rdns::telemetry::{RequestTracker, DEFAULT_RING_CAPACITY};
use rdns::upstream::{spawn_cleanup_task, ConnectionPool, UpstreamServers};

/// How long `acquire` on the concurrency limiter waits for a permit before
/// giving up, per spec.md §5. Not presently a config field; the spec
/// names only the limiter's capacity and queue size as tunables.
const CONCURRENCY_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Overall wall-clock budget given to a single resolution, per spec.md §3's
/// `QueryContext` deadline.
const RESOLUTION_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_RECURSION_DEPTH: u32 = 10;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_default_config {
        println!("{}", ConfigFile::default().as_json_pretty());
        return ExitCode::SUCCESS;
    }

    let config = match ConfigFile::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration error: {error}");
            return ExitCode::FAILURE;
        }
    };

    rdns::logging::init(&cli.effective_log_level(&config.log_level));
    info!(%config, "starting rdns");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers.max(1))
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to start async runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "fatal startup failure");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ConfigFile) -> Result<(), ResolverError> {
    // Held behind a cowcell so a future reload path can swap it in without
    // any reader ever blocking; nothing currently triggers a reload.
    let shared_config = rdns::config::SharedConfig::new(config);
    let config = shared_config.current().await;

    let listen_addr = config.server.dns_listener_address()?;

    let upstreams = UpstreamServers::from_config(
        &config.upstream_servers,
        config.server.connection_timeout(),
        3,
    )?;
    let pool = Arc::new(ConnectionPool::new(
        config.server.max_upstream_connections,
        config.server.connection_timeout(),
    ));
    let resolver = Arc::new(Resolver::new(
        upstreams,
        Arc::clone(&pool),
        MAX_RECURSION_DEPTH,
        RESOLUTION_TIMEOUT,
    ));

    let cache = Arc::new(CacheEngine::new(CacheConfig {
        max_size: config.cache.max_size,
        max_memory_bytes: config.cache.max_memory_bytes(),
        default_ttl: config.cache.default_ttl,
        min_ttl: config.cache.min_ttl,
        max_ttl: config.cache.max_ttl,
        negative_ttl: config.cache.negative_ttl,
    }));

    let ctx = Arc::new(ServerContext {
        cache: Arc::clone(&cache),
        resolver,
        rate_limiter: Arc::new(RateLimiter::new(config.security.rate_limit_per_ip)),
        concurrency: Arc::new(ConcurrencyLimiter::new(
            config.server.max_concurrent_requests,
            config.server.request_queue_size,
            CONCURRENCY_WAIT_TIMEOUT,
        )),
        telemetry: Arc::new(RequestTracker::new(DEFAULT_RING_CAPACITY)),
        capture_packets: config.capture_packets,
        recursion_available: true,
    });

    let sweep_task = spawn_sweep_task(Arc::clone(&cache), config.cache.cleanup_interval());
    let cleanup_task = spawn_cleanup_task(Arc::clone(&pool), config.server.connection_timeout());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let udp_task = tokio::spawn(serve_udp(listen_addr, Arc::clone(&ctx), shutdown_rx.clone()));
    let tcp_task = tokio::spawn(serve_tcp(listen_addr, ctx, shutdown_rx));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.map_err(|err| ResolverError::Internal(err.to_string()))?;
            info!("shutdown signal received, draining in-flight requests");
        }
    }

    let _ = shutdown_tx.send(true);
    sweep_task.abort();
    cleanup_task.abort();

    match udp_task.await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => error!(%error, "UDP listener exited with an error"),
        Err(error) => error!(%error, "UDP listener task panicked"),
    }
    match tcp_task.await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => error!(%error, "TCP listener exited with an error"),
        Err(error) => error!(%error, "TCP listener task panicked"),
    }

    info!("shutdown complete");
    Ok(())
}
