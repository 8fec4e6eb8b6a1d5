use crate::error::SwapError;
use crate::scorer::{CompatibilityReport, CompatibilityScorer};
use serde::Serialize;
use std::sync::Arc;
use stayswap_core::booking::BookingDirectory;
use stayswap_core::identity::OwnershipResolver;
use stayswap_core::repository::{SwapRepository, TargetRepository};
use stayswap_domain::{Swap, SwapTarget};
use uuid::Uuid;

/// Everything a viewer needs to act on a swap: the listing, its live edges,
/// and a freshly computed compatibility report per incoming proposal.
#[derive(Debug, Serialize)]
pub struct SwapCard {
    pub swap: Swap,
    pub viewer_is_owner: bool,
    pub incoming_targets: Vec<SwapTarget>,
    pub outgoing_target: Option<SwapTarget>,
    pub compatibility_reports: Vec<TargetCompatibility>,
}

#[derive(Debug, Serialize)]
pub struct TargetCompatibility {
    pub edge_id: Uuid,
    pub proposer_swap_id: Uuid,
    pub report: CompatibilityReport,
}

pub struct SwapCards {
    swaps: Arc<dyn SwapRepository>,
    targets: Arc<dyn TargetRepository>,
    bookings: Arc<dyn BookingDirectory>,
    ownership: Arc<dyn OwnershipResolver>,
}

impl SwapCards {
    pub fn new(
        swaps: Arc<dyn SwapRepository>,
        targets: Arc<dyn TargetRepository>,
        bookings: Arc<dyn BookingDirectory>,
        ownership: Arc<dyn OwnershipResolver>,
    ) -> Self {
        Self {
            swaps,
            targets,
            bookings,
            ownership,
        }
    }

    /// Snapshot read; reports are recomputed here and never stored, so a
    /// booking edit upstream corrects them on the next call. Unresolvable
    /// joins degrade the affected report instead of failing the card.
    pub async fn swap_card(&self, swap_id: Uuid, viewer: Uuid) -> Result<SwapCard, SwapError> {
        let swap = self
            .swaps
            .get_swap(swap_id)
            .await?
            .ok_or(SwapError::SwapNotFound(swap_id))?;

        let viewer_is_owner = self
            .ownership
            .owns_booking(viewer, swap.source_booking_id)
            .await?;

        let incoming_targets = self.targets.incoming(swap_id, false).await?;
        let outgoing_target = self.targets.outgoing(swap_id, false).await?.pop();

        let own_booking = self.bookings.get_booking(swap.source_booking_id).await?;

        let mut compatibility_reports = Vec::with_capacity(incoming_targets.len());
        for edge in &incoming_targets {
            let proposer_booking = match self.swaps.get_swap(edge.source_swap_id).await? {
                Some(proposer_swap) => {
                    self.bookings
                        .get_booking(proposer_swap.source_booking_id)
                        .await?
                }
                None => None,
            };
            compatibility_reports.push(TargetCompatibility {
                edge_id: edge.id,
                proposer_swap_id: edge.source_swap_id,
                report: CompatibilityScorer::score(
                    proposer_booking.as_ref(),
                    own_booking.as_ref(),
                ),
            });
        }

        Ok(SwapCard {
            swap,
            viewer_is_owner,
            incoming_targets,
            outgoing_target,
            compatibility_reports,
        })
    }
}
