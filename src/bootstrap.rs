//! One-time startup seeding of the live state.
//!
//! Runs before the HTTP server accepts requests and before the gateway
//! starts delivering messages.

use crate::chat::{ChatPlatform, Ingester};
use crate::commits::CommitAggregator;
use crate::error::ChatError;
use crate::state::LiveState;
use tracing::info;

/// What the bootstrap run found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSummary {
    pub status_seeded: bool,
    pub update_seeded: bool,
    pub commits: usize,
    pub failed_sources: usize,
}

/// Seed status and update from chat history, then publish the first commit feed.
///
/// Failing to read either channel's history is fatal. Failing commit
/// sources are not.
pub async fn bootstrap(
    platform: &dyn ChatPlatform,
    ingester: &Ingester,
    aggregator: &CommitAggregator,
    state: &LiveState,
    history_limit: u8,
) -> Result<BootstrapSummary, ChatError> {
    let channels = ingester.channels();

    info!(channel = %channels.status, "Reading current status");
    let status_history = platform.recent_messages(&channels.status, history_limit).await?;

    info!(channel = %channels.updates, "Reading latest update");
    let update_history = platform.recent_messages(&channels.updates, history_limit).await?;

    let (status_seeded, update_seeded) = ingester.seed(&status_history, &update_history);

    info!(sources = aggregator.source_count(), "Fetching initial commit feed");
    let report = aggregator.refresh(state).await;

    Ok(BootstrapSummary {
        status_seeded,
        update_seeded,
        commits: report.published,
        failed_sources: report.failed.len(),
    })
}
