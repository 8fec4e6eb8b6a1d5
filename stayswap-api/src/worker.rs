use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use stayswap_match::{ExpirySweeper, ResolutionEngine};
use stayswap_shared::events::MintResultEvent;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Consumes mint results from the ledger collaborator and settles the
/// corresponding match. Delivery is at-least-once; the engine's handlers are
/// idempotent by match id, so a redelivered result is a no-op.
pub async fn run_mint_result_worker(
    engine: Arc<ResolutionEngine>,
    mut results: mpsc::Receiver<MintResultEvent>,
) {
    info!("Mint result worker started");
    while let Some(event) = results.recv().await {
        let match_id = event.match_id();
        if let Err(e) = engine.on_mint_result(event).await {
            // Left PENDING; the collaborator retries and the handler is safe
            // to re-run.
            error!("Failed to apply mint result for match {}: {}", match_id, e);
        }
    }
    info!("Mint result channel closed, worker stopping");
}

/// Periodically expires overdue swaps and cascades cancellation of their
/// edges.
pub async fn run_expiry_sweeper(sweeper: Arc<ExpirySweeper>, interval: Duration) {
    info!("Expiry sweeper started, interval {:?}", interval);
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match sweeper.sweep(Utc::now()).await {
            Ok(0) => {}
            Ok(n) => info!("Expiry sweep transitioned {} swaps", n),
            Err(e) => error!("Expiry sweep failed: {}", e),
        }
    }
}
