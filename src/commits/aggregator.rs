//! Commit aggregation across sources.
//!
//! This module fans out to every configured source, merges whatever came
//! back, ranks by commit date and publishes the bounded feed.

use super::CommitSource;
use crate::error::FetchError;
use crate::models::{CommitFeed, CommitRecord};
use crate::state::LiveState;
use futures::future::join_all;
use std::cmp::Reverse;
use std::time::Duration;
use tracing::{info, warn};

/// Default maximum length of the published feed.
pub const DEFAULT_FEED_LIMIT: usize = 200;

/// Merge per-source batches into one feed, newest first.
///
/// The sort is stable, so equal dates keep source order. Records whose
/// date does not parse rank as the Unix epoch.
pub fn merge_feed(batches: Vec<Vec<CommitRecord>>, limit: usize) -> CommitFeed {
    let mut feed: CommitFeed = batches.into_iter().flatten().collect();
    feed.sort_by_cached_key(|c| Reverse(c.committed_at()));
    feed.truncate(limit);
    feed
}

/// Outcome of one aggregation run.
#[derive(Debug, Clone, Default)]
pub struct AggregationReport {
    pub feed: CommitFeed,
    /// Number of sources that answered with a decodable list.
    pub succeeded: usize,
    /// Sources that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Counts from one published refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Length of the feed now being served.
    pub published: usize,
    pub succeeded: usize,
    pub failed: Vec<(String, String)>,
}

/// Fetches, merges and publishes the commit feed.
pub struct CommitAggregator {
    sources: Vec<Box<dyn CommitSource>>,
    fetch_timeout: Duration,
    limit: usize,
}

impl CommitAggregator {
    pub fn new(sources: Vec<Box<dyn CommitSource>>, fetch_timeout: Duration, limit: usize) -> Self {
        Self {
            sources,
            fetch_timeout,
            limit,
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Run every source once and merge the results.
    ///
    /// A failing source contributes nothing; it never fails the run.
    pub async fn aggregate(&self) -> AggregationReport {
        let fetches = self.sources.iter().map(|source| async move {
            let result = match tokio::time::timeout(self.fetch_timeout, source.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(self.fetch_timeout)),
            };
            (source.name(), result)
        });

        let mut report = AggregationReport::default();
        let mut batches = Vec::with_capacity(self.sources.len());

        for (name, result) in join_all(fetches).await {
            match result {
                Ok(commits) => {
                    report.succeeded += 1;
                    batches.push(commits);
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "Commit source failed");
                    report.failed.push((name.to_string(), e.to_string()));
                }
            }
        }

        report.feed = merge_feed(batches, self.limit);
        report
    }

    /// Aggregate and publish the new feed, replacing the previous one.
    ///
    /// A run where every source failed publishes an empty feed.
    pub async fn refresh(&self, state: &LiveState) -> RefreshSummary {
        let AggregationReport {
            feed,
            succeeded,
            failed,
        } = self.aggregate().await;

        let published = feed.len();
        state.publish_commits(feed);
        info!(
            commits = published,
            succeeded,
            failed = failed.len(),
            "Published commit feed"
        );

        RefreshSummary {
            published,
            succeeded,
            failed,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub(crate) fn create_test_commit(date: &str, tag: &str) -> CommitRecord {
        let mut record = CommitRecord::default();
        record.commit.author.date = date.to_string();
        record.commit.message = tag.to_string();
        record
    }

    /// Source returning a fixed result, counting calls.
    pub(crate) struct FixedSource {
        pub name: String,
        pub result: Result<Vec<CommitRecord>, u16>,
        pub calls: Arc<AtomicUsize>,
    }

    impl FixedSource {
        pub(crate) fn ok(name: &str, commits: Vec<CommitRecord>) -> Self {
            Self {
                name: name.to_string(),
                result: Ok(commits),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn failing(name: &str) -> Self {
            Self {
                name: name.to_string(),
                result: Err(500),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl CommitSource for FixedSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(&self) -> Result<Vec<CommitRecord>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Ok(commits) => Ok(commits.clone()),
                Err(code) => Err(FetchError::Status(
                    reqwest::StatusCode::from_u16(*code).unwrap(),
                )),
            }
        }
    }

    struct StalledSource;

    #[async_trait]
    impl CommitSource for StalledSource {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn fetch(&self) -> Result<Vec<CommitRecord>, FetchError> {
            futures::future::pending().await
        }
    }

    fn batch(source: usize, count: usize) -> Vec<CommitRecord> {
        (0..count)
            .map(|i| {
                let date = format!("2024-01-{:02}T{:02}:00:00Z", 1 + (i % 28), source);
                create_test_commit(&date, &format!("{source}/{i}"))
            })
            .collect()
    }

    fn is_ranked(feed: &[CommitRecord]) -> bool {
        feed.windows(2)
            .all(|pair| pair[0].committed_at() >= pair[1].committed_at())
    }

    #[test]
    fn test_merge_feed_ranks_newest_first() {
        let feed = merge_feed(
            vec![
                vec![
                    create_test_commit("2024-01-01T00:00:00Z", "a"),
                    create_test_commit("2024-03-01T00:00:00Z", "b"),
                ],
                vec![create_test_commit("2024-02-01T00:00:00+02:00", "c")],
            ],
            DEFAULT_FEED_LIMIT,
        );

        let order: Vec<_> = feed.iter().map(|c| c.commit.message.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_merge_feed_keeps_duplicates() {
        let commit = create_test_commit("2024-01-01T00:00:00Z", "same");
        let feed = merge_feed(vec![vec![commit.clone()], vec![commit]], DEFAULT_FEED_LIMIT);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn test_merge_feed_unparseable_dates_last() {
        let feed = merge_feed(
            vec![vec![
                create_test_commit("not a date", "broken"),
                create_test_commit("1999-12-31T23:59:59Z", "old"),
                create_test_commit("", "missing"),
            ]],
            DEFAULT_FEED_LIMIT,
        );

        let order: Vec<_> = feed.iter().map(|c| c.commit.message.as_str()).collect();
        assert_eq!(order, vec!["old", "broken", "missing"]);
    }

    #[test]
    fn test_merge_feed_truncates() {
        let batches: Vec<_> = (0..7).map(|s| batch(s, 50)).collect();
        let feed = merge_feed(batches, DEFAULT_FEED_LIMIT);

        assert_eq!(feed.len(), 200);
        assert!(is_ranked(&feed));
    }

    #[test]
    fn test_merge_feed_length_is_min_of_limit_and_total() {
        for (sources, per_source) in [(0, 0), (1, 10), (3, 50), (5, 40), (7, 50)] {
            let batches: Vec<_> = (0..sources).map(|s| batch(s, per_source)).collect();
            let feed = merge_feed(batches, DEFAULT_FEED_LIMIT);
            assert_eq!(feed.len(), (sources * per_source).min(DEFAULT_FEED_LIMIT));
            assert!(is_ranked(&feed));
        }
    }

    #[tokio::test]
    async fn test_partial_failure_still_publishes() {
        let sources: Vec<Box<dyn CommitSource>> = vec![
            Box::new(FixedSource::ok("one", batch(1, 3))),
            Box::new(FixedSource::failing("two")),
            Box::new(FixedSource::ok("three", batch(3, 4))),
        ];
        let aggregator = CommitAggregator::new(sources, Duration::from_secs(5), DEFAULT_FEED_LIMIT);
        let state = LiveState::new();

        let report = aggregator.refresh(&state).await;

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "two");
        assert_eq!(report.published, 7);
        assert_eq!(state.commits().len(), 7);
        assert!(is_ranked(&state.commits()));
    }

    #[tokio::test]
    async fn test_all_sources_failing_publishes_empty_feed() {
        let state = LiveState::new();
        state.publish_commits(batch(0, 5));

        let sources: Vec<Box<dyn CommitSource>> = vec![
            Box::new(FixedSource::failing("one")),
            Box::new(FixedSource::failing("two")),
        ];
        let aggregator = CommitAggregator::new(sources, Duration::from_secs(5), DEFAULT_FEED_LIMIT);
        let report = aggregator.refresh(&state).await;

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.published, 0);
        assert!(state.commits().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_summary_matches_published_feed() {
        let sources: Vec<Box<dyn CommitSource>> = vec![
            Box::new(FixedSource::ok("one", batch(1, 150))),
            Box::new(FixedSource::ok("two", batch(2, 150))),
        ];
        let aggregator = CommitAggregator::new(sources, Duration::from_secs(5), DEFAULT_FEED_LIMIT);
        let state = LiveState::new();

        let summary = aggregator.refresh(&state).await;

        assert_eq!(
            summary,
            RefreshSummary {
                published: DEFAULT_FEED_LIMIT,
                succeeded: 2,
                failed: Vec::new(),
            }
        );
        assert_eq!(state.commits().len(), summary.published);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_source_times_out() {
        let sources: Vec<Box<dyn CommitSource>> = vec![
            Box::new(StalledSource),
            Box::new(FixedSource::ok("live", batch(1, 2))),
        ];
        let aggregator = CommitAggregator::new(sources, Duration::from_secs(20), DEFAULT_FEED_LIMIT);

        let report = aggregator.aggregate().await;

        assert_eq!(report.feed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "stalled");
        assert!(report.failed[0].1.contains("20s"));
    }

    #[tokio::test]
    async fn test_no_sources_publishes_empty_feed() {
        let aggregator = CommitAggregator::new(Vec::new(), Duration::from_secs(5), DEFAULT_FEED_LIMIT);
        let state = LiveState::new();
        let report = aggregator.refresh(&state).await;

        assert_eq!(report.succeeded, 0);
        assert!(state.commits().is_empty());
    }
}
