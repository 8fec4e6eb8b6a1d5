pub mod engine;
pub mod error;
pub mod expiry;
pub mod graph;
pub mod history;
pub mod listings;
pub mod locks;
pub mod queries;
pub mod scorer;

pub use engine::ResolutionEngine;
pub use error::{Outcome, SwapError};
pub use expiry::ExpirySweeper;
pub use graph::TargetingGraph;
pub use history::TargetingHistory;
pub use listings::SwapService;
pub use locks::SwapLocks;
pub use queries::{SwapCard, SwapCards, TargetCompatibility};
pub use scorer::{CompatibilityReport, CompatibilityScorer, FactorScore, FactorStatus};
