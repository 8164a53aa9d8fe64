//! Pagination aggregator.
//!
//! Retrieves an entire remote collection by probing for the total, fanning
//! out one concurrent fetch task per remaining page, and merging pages as
//! they arrive in arbitrary completion order. Every fetch task holds a clone
//! of one mpsc sender; the channel closing is therefore the all-pages
//! barrier, with no separate done signal.

use remote_traits::listing::{Page, PagedSource};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::SyncError;

/// Page size used for the fan-out after the initial probe.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Fetch every item of a paginated remote collection.
///
/// The first request asks for a single item to learn the true total cheaply;
/// if that already covers the collection the result is returned immediately.
/// Otherwise one fetch task per page of `page_size` is dispatched, with no
/// concurrency cap beyond the number of pages.
///
/// A failed page is logged and its items are simply absent from the result;
/// a partial listing is preferred over an aborted one. Only a failed probe is
/// fatal, since without it the total is unknown.
///
/// The merged result is sorted by `sort_key` before being returned, so the
/// arbitrary arrival order of pages never shows through.
#[instrument(skip_all, fields(page_size))]
pub async fn list_all<S, K, O>(
    source: Arc<S>,
    page_size: u32,
    cancel: CancellationToken,
    sort_key: K,
) -> Result<Vec<S::Item>>
where
    S: PagedSource + ?Sized + 'static,
    K: Fn(&S::Item) -> O,
    O: Ord,
{
    if page_size == 0 {
        return Err(SyncError::Configuration(
            "page size must be at least 1".to_string(),
        ));
    }

    let probe = source.fetch_page(1, 1).await?;
    let total = probe.total;
    debug!(total, "probed collection size");

    let covers_total = probe.covers_total();
    let probe_count = probe.count;
    let mut items = probe.items;
    if covers_total {
        items.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        return Ok(items);
    }

    let (tx, mut rx) = mpsc::channel::<Page<S::Item>>(16);

    let mut start = probe_count + 1;
    while start <= total {
        if cancel.is_cancelled() {
            warn!(start, "listing cancelled; remaining pages not dispatched");
            break;
        }

        debug!(start, count = page_size, "dispatching page fetch");
        let source = Arc::clone(&source);
        let tx = tx.clone();
        tokio::spawn(async move {
            match source.fetch_page(start, page_size).await {
                Ok(page) => {
                    // Collector gone means the caller stopped caring.
                    let _ = tx.send(page).await;
                }
                Err(error) => {
                    warn!(start, %error, "page fetch failed; its items are omitted from the result");
                }
            }
        });

        start += page_size;
    }
    drop(tx);

    while let Some(page) = rx.recv().await {
        debug!(start = page.start, count = page.count, "collected page");
        items.extend(page.items);
    }

    items.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use remote_traits::RemoteError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Source over the numbers 1..=total, with optional per-start failures
    /// and a delay schedule that makes later pages finish first.
    struct ScriptedSource {
        total: u32,
        calls: AtomicU32,
        fail_starts: Vec<u32>,
    }

    impl ScriptedSource {
        fn new(total: u32) -> Self {
            Self {
                total,
                calls: AtomicU32::new(0),
                fail_starts: Vec::new(),
            }
        }

        fn failing_at(mut self, start: u32) -> Self {
            self.fail_starts.push(start);
            self
        }
    }

    #[async_trait]
    impl PagedSource for ScriptedSource {
        type Item = u32;

        async fn fetch_page(&self, start: u32, count: u32) -> remote_traits::Result<Page<u32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self.fail_starts.contains(&start) {
                return Err(RemoteError::Network("synthetic page failure".to_string()));
            }

            // Earlier pages sleep longer, scrambling arrival order.
            let delay = 20u64.saturating_sub(u64::from(start) / 20);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let remaining = self.total.saturating_sub(start - 1);
            let n = count.min(remaining);
            Ok(Page {
                items: (start..start + n).collect(),
                total: self.total,
                start,
                count: n,
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_merges_all_pages_regardless_of_arrival_order() {
        let source = Arc::new(ScriptedSource::new(250));
        let items = list_all(
            Arc::clone(&source),
            100,
            CancellationToken::new(),
            |item| *item,
        )
        .await
        .unwrap();

        let unique: HashSet<u32> = items.iter().copied().collect();
        assert_eq!(items.len(), 250);
        assert_eq!(unique.len(), 250);
        // Probe plus pages starting at 2, 102 and 202.
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_result_is_sorted_by_key() {
        let source = Arc::new(ScriptedSource::new(250));
        // Sort descending to prove the key is honored, not arrival order.
        let items = list_all(source, 100, CancellationToken::new(), |item| {
            std::cmp::Reverse(*item)
        })
        .await
        .unwrap();

        assert_eq!(items.first(), Some(&250));
        assert_eq!(items.last(), Some(&1));
    }

    #[tokio::test]
    async fn test_single_item_short_circuits() {
        let source = Arc::new(ScriptedSource::new(1));
        let items = list_all(
            Arc::clone(&source),
            100,
            CancellationToken::new(),
            |item| *item,
        )
        .await
        .unwrap();

        assert_eq!(items, vec![1]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_collection_is_ok() {
        let source = Arc::new(ScriptedSource::new(0));
        let items = list_all(
            Arc::clone(&source),
            100,
            CancellationToken::new(),
            |item| *item,
        )
        .await
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_page_yields_partial_result() {
        let source = Arc::new(ScriptedSource::new(250).failing_at(102));
        let items = list_all(
            Arc::clone(&source),
            100,
            CancellationToken::new(),
            |item| *item,
        )
        .await
        .unwrap();

        // Probe item plus pages at 2 and 202; the page at 102 is dropped.
        assert_eq!(items.len(), 150);
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_failed_probe_is_fatal() {
        let source = Arc::new(ScriptedSource::new(250).failing_at(1));
        let result = list_all(source, 100, CancellationToken::new(), |item| *item).await;
        assert!(matches!(result, Err(SyncError::Remote(_))));
    }

    #[tokio::test]
    async fn test_cancellation_stops_dispatch() {
        let source = Arc::new(ScriptedSource::new(250));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let items = list_all(Arc::clone(&source), 100, cancel, |item| *item)
            .await
            .unwrap();

        // Only the probe ran; no pages were dispatched.
        assert_eq!(items, vec![1]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_page_size_is_rejected() {
        let source = Arc::new(ScriptedSource::new(10));
        let result = list_all(source, 0, CancellationToken::new(), |item| *item).await;
        assert!(matches!(result, Err(SyncError::Configuration(_))));
    }
}
