use std::sync::Arc;
use stayswap_match::{ResolutionEngine, SwapCards, SwapService, TargetingGraph, TargetingHistory};
use stayswap_shared::events::NotificationEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
    pub swaps: Arc<SwapService>,
    pub graph: Arc<TargetingGraph>,
    pub engine: Arc<ResolutionEngine>,
    pub cards: Arc<SwapCards>,
    pub history: Arc<TargetingHistory>,
    pub notifications: broadcast::Sender<NotificationEvent>,
}
