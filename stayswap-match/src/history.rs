use crate::error::SwapError;
use std::sync::Arc;
use stayswap_core::repository::TargetEventLog;
use stayswap_domain::{EventFilter, Page, PageRequest, TargetEvent};

/// Read-only projection over the append-only edge transition log.
///
/// Together with the scorer's degrade-to-neutral policy this is what makes
/// data loss detectable: every transition is written once and never edited.
pub struct TargetingHistory {
    log: Arc<dyn TargetEventLog>,
}

impl TargetingHistory {
    pub fn new(log: Arc<dyn TargetEventLog>) -> Self {
        Self { log }
    }

    pub async fn query(
        &self,
        filter: &EventFilter,
        page: &PageRequest,
    ) -> Result<Page<TargetEvent>, SwapError> {
        Ok(self.log.query(filter, &page.normalized()).await?)
    }
}
