use crate::RepoResult;
use async_trait::async_trait;
use stayswap_shared::events::{MatchCreatedEvent, MintResultEvent};
use tokio::sync::mpsc;

/// Hand-off to the NFT mint collaborator.
///
/// Submission is at-least-once message passing; the collaborator reports
/// back asynchronously via `MintResultEvent` and the engine's handlers are
/// idempotent by match id.
#[async_trait]
pub trait LedgerMint: Send + Sync {
    async fn submit(&self, event: &MatchCreatedEvent) -> RepoResult<()>;
}

/// Mock mint that acknowledges every match immediately.
///
/// Useful in tests and local runs; set `fail` to exercise the rollback path.
pub struct MockLedgerMint {
    results: mpsc::Sender<MintResultEvent>,
    fail: bool,
}

impl MockLedgerMint {
    pub fn new(results: mpsc::Sender<MintResultEvent>, fail: bool) -> Self {
        Self { results, fail }
    }
}

#[async_trait]
impl LedgerMint for MockLedgerMint {
    async fn submit(&self, event: &MatchCreatedEvent) -> RepoResult<()> {
        let result = if self.fail {
            MintResultEvent::MintFailed {
                match_id: event.match_id,
                reason: "mock mint configured to fail".to_string(),
            }
        } else {
            MintResultEvent::MintSucceeded {
                match_id: event.match_id,
            }
        };

        tracing::info!("Mock mint result for match {}: {:?}", event.match_id, result);
        self.results.send(result).await?;
        Ok(())
    }
}
