use uuid::Uuid;

/// Errors surfaced by the targeting graph, swap lifecycle, and resolution
/// engine.
///
/// Validation errors are surfaced verbatim and never retried. Concurrency
/// errors carry a re-fetch-and-retry contract; the engine never retries
/// internally on the caller's behalf.
#[derive(Debug, thiserror::Error)]
pub enum SwapError {
    // --- validation ---
    #[error("a swap cannot target itself")]
    SelfTarget,

    #[error("user {user_id} does not own the booking behind swap {swap_id}")]
    OwnershipMismatch { user_id: Uuid, swap_id: Uuid },

    #[error("source swap {0} is not active")]
    SourceNotActive(Uuid),

    #[error("target swap {0} is not active")]
    TargetNotActive(Uuid),

    #[error("swap {0} already has an active outgoing target")]
    SourceAlreadyTargeting(Uuid),

    #[error("one-for-one swap {0} already has an active incoming target")]
    TargetExclusivityViolation(Uuid),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("booking {0} is not available for swapping")]
    InvalidBookingState(Uuid),

    #[error("booking {0} already has an active swap")]
    DuplicateSwap(Uuid),

    #[error("auction swaps require an auction window")]
    MissingAuctionWindow,

    #[error("invalid auction window: {0}")]
    InvalidAuctionWindow(String),

    #[error("swap expiry must be in the future")]
    InvalidExpiry,

    // --- concurrency; re-fetch and retry ---
    #[error("edge {0} is no longer active")]
    EdgeNotActive(Uuid),

    #[error("swap {0} changed state mid-flight")]
    StaleSwapState(Uuid),

    #[error("timed out waiting on a concurrent operation against the same swap pair")]
    ConcurrentModification,

    // --- lookup ---
    #[error("swap {0} not found")]
    SwapNotFound(Uuid),

    #[error("edge {0} not found")]
    EdgeNotFound(Uuid),

    #[error("booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("match {0} not found")]
    MatchNotFound(Uuid),

    // --- plumbing ---
    #[error("storage error: {0}")]
    Storage(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl SwapError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SwapError::SelfTarget
                | SwapError::OwnershipMismatch { .. }
                | SwapError::SourceNotActive(_)
                | SwapError::TargetNotActive(_)
                | SwapError::SourceAlreadyTargeting(_)
                | SwapError::TargetExclusivityViolation(_)
                | SwapError::InvalidTransition { .. }
                | SwapError::InvalidBookingState(_)
                | SwapError::DuplicateSwap(_)
                | SwapError::MissingAuctionWindow
                | SwapError::InvalidAuctionWindow(_)
                | SwapError::InvalidExpiry
        )
    }

    /// Safe to re-fetch state and retry the call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SwapError::EdgeNotActive(_)
                | SwapError::StaleSwapState(_)
                | SwapError::ConcurrentModification
        )
    }
}

/// Result of a mutating operation that may already have been applied.
///
/// `AlreadyApplied` is informational, not an error: repeating an accept or
/// reject against an edge that already settled the same way is a no-op and
/// must not re-trigger side effects.
#[derive(Debug)]
pub enum Outcome<T> {
    Applied(T),
    AlreadyApplied,
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::AlreadyApplied => None,
        }
    }
}
