use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use stayswap_api::{app, worker, AppState};
use stayswap_core::booking::BookingDirectory;
use stayswap_core::identity::{DerivedOwnershipResolver, OwnershipResolver};
use stayswap_core::ledger::{LedgerMint, MockLedgerMint};
use stayswap_core::notify::{BroadcastNotifier, Notifier};
use stayswap_core::repository::{
    MatchRepository, SwapRepository, TargetEventLog, TargetRepository,
};
use stayswap_match::{
    ExpirySweeper, ResolutionEngine, SwapCards, SwapLocks, SwapService, TargetingGraph,
    TargetingHistory,
};
use stayswap_store::{
    DbClient, PostgresBookingDirectory, PostgresMatchRepository, PostgresSwapRepository,
    PostgresTargetEventLog, PostgresTargetRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stayswap_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = stayswap_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting StaySwap API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let swaps: Arc<dyn SwapRepository> = Arc::new(PostgresSwapRepository {
        pool: db.pool.clone(),
    });
    let targets: Arc<dyn TargetRepository> = Arc::new(PostgresTargetRepository {
        pool: db.pool.clone(),
    });
    let matches: Arc<dyn MatchRepository> = Arc::new(PostgresMatchRepository {
        pool: db.pool.clone(),
    });
    let log: Arc<dyn TargetEventLog> = Arc::new(PostgresTargetEventLog {
        pool: db.pool.clone(),
    });
    let bookings: Arc<dyn BookingDirectory> = Arc::new(PostgresBookingDirectory {
        pool: db.pool.clone(),
    });
    let ownership: Arc<dyn OwnershipResolver> =
        Arc::new(DerivedOwnershipResolver::new(bookings.clone()));

    // SSE Broadcast Channel
    let (notify_tx, _) = tokio::sync::broadcast::channel(100);
    let notifier: Arc<dyn Notifier> = Arc::new(BroadcastNotifier::new(notify_tx.clone()));

    // Mint hand-off and its result channel
    let (mint_tx, mint_rx) = tokio::sync::mpsc::channel(100);
    let mint: Arc<dyn LedgerMint> =
        Arc::new(MockLedgerMint::new(mint_tx, config.engine.mint_always_fails));

    // One lock table shared by every mutating path
    let locks = SwapLocks::new();
    let lock_wait = Duration::from_millis(config.engine.lock_wait_ms);

    let service = Arc::new(SwapService::new(
        swaps.clone(),
        bookings.clone(),
        ownership.clone(),
    ));
    let graph = Arc::new(TargetingGraph::new(
        swaps.clone(),
        targets.clone(),
        ownership.clone(),
        log.clone(),
        notifier.clone(),
        locks.clone(),
        lock_wait,
    ));
    let engine = Arc::new(ResolutionEngine::new(
        swaps.clone(),
        targets.clone(),
        matches.clone(),
        bookings.clone(),
        ownership.clone(),
        log.clone(),
        notifier.clone(),
        mint.clone(),
        locks.clone(),
        lock_wait,
    ));
    let cards = Arc::new(SwapCards::new(
        swaps.clone(),
        targets.clone(),
        bookings.clone(),
        ownership.clone(),
    ));
    let history = Arc::new(TargetingHistory::new(log.clone()));
    let sweeper = Arc::new(ExpirySweeper::new(
        swaps.clone(),
        log.clone(),
        locks.clone(),
        lock_wait,
    ));

    tokio::spawn(worker::run_mint_result_worker(engine.clone(), mint_rx));
    tokio::spawn(worker::run_expiry_sweeper(
        sweeper,
        Duration::from_secs(config.engine.sweep_interval_seconds),
    ));

    let app_state = AppState {
        swaps: service,
        graph,
        engine,
        cards,
        history,
        notifications: notify_tx,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
