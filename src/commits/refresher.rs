//! Periodic commit feed refresh.

use super::CommitAggregator;
use crate::state::LiveState;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Refresh the commit feed forever, sleeping `interval` between runs.
///
/// The sleep starts when the previous run has finished, so runs never
/// overlap. The initial feed is expected to have been published already.
pub async fn run_periodic(aggregator: Arc<CommitAggregator>, state: Arc<LiveState>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        debug!("Refreshing commit feed");
        aggregator.refresh(&state).await;
    }
}
