//! Batched concurrent fetching of offset-paginated listings

use std::sync::mpsc;

use indicatif::ProgressBar;
use restline_core::{Credential, fmt_num};

use crate::dataset::DatasetKind;
use crate::error::ExtractError;
use crate::fetcher::PagedResourceFetcher;
use crate::filter::RecordFilter;
use crate::page::{CallCounter, PageOutcome, PageRequest, Record};

/// Counters from one collection pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectStats {
    pub batches: usize,
    pub pages_fetched: usize,
    pub pages_skipped: usize,
    pub records_kept: usize,
    pub records_dropped: usize,
}

/// Fetches `workers` pages at a time until a whole batch reports no more data.
///
/// Each batch is a barrier: the next one is only submitted after every page
/// of the current one has returned. Pages past the real end come back empty
/// and are accepted as such.
pub struct ConcurrentPageCollector<'a> {
    fetcher: PagedResourceFetcher<'a>,
    workers: usize,
    page_size: usize,
}

impl<'a> ConcurrentPageCollector<'a> {
    pub fn new(fetcher: PagedResourceFetcher<'a>, workers: usize, page_size: usize) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
            page_size,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run to exhaustion, appending filtered records to `dataset` in the order
    /// page fetches complete within each batch.
    pub fn collect(
        &self,
        kind: DatasetKind,
        filter: &RecordFilter,
        credential: &Credential,
        calls: &CallCounter,
        dataset: &mut Vec<Record>,
        pb: &ProgressBar,
    ) -> Result<CollectStats, ExtractError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("page-worker-{i}"))
            .build()?;
        log::info!(
            "{kind}: fetching {} with {} workers, page size {}",
            self.fetcher.endpoint(),
            self.workers,
            self.page_size
        );

        let mut stats = CollectStats::default();
        let mut next_page = 1usize;
        let mut has_more = true;

        while has_more {
            let last_page = next_page + self.workers - 1;
            pb.set_message(format!(
                "pages {next_page}-{last_page} ({} records)",
                fmt_num(dataset.len())
            ));

            let (tx, rx) = mpsc::channel();
            pool.scope(|s| {
                for page in next_page..=last_page {
                    let tx = tx.clone();
                    s.spawn(move |_| {
                        let request = PageRequest::offset(page, self.page_size);
                        let outcome = self.fetcher.fetch(&request, credential, calls);
                        // Receiver outlives the scope
                        let _ = tx.send(outcome);
                    });
                }
            });
            drop(tx);

            has_more = false;
            for outcome in rx {
                has_more |= outcome.has_more();
                match outcome {
                    PageOutcome::Success(result) => {
                        stats.pages_fetched += 1;
                        let fetched = result.records.len();
                        let kept = filter.apply(kind, &result.records);
                        stats.records_kept += kept.len();
                        stats.records_dropped += fetched - kept.len();
                        log::debug!("Page {} completed: {} of {fetched} kept", result.page, kept.len());
                        dataset.extend(kept);
                    }
                    PageOutcome::Skipped { page, reason } => {
                        stats.pages_skipped += 1;
                        log::warn!("Page {page} skipped ({reason}); treating as end of data");
                    }
                }
            }

            stats.batches += 1;
            next_page += self.workers;
            log::info!(
                "{kind}: batch {} done, {} records so far, {} API calls",
                stats.batches,
                fmt_num(dataset.len()),
                calls.get()
            );
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restline_core::HttpReply;
    use restline_core::http::testing::MockTransport;
    use serde_json::json;

    /// Serves `total_pages` pages of `per_page` users each; page N reports
    /// more data while N < total_pages. Pages in `failing` answer 500.
    fn listing(total_pages: usize, per_page: usize, failing: Vec<usize>) -> MockTransport {
        MockTransport::new(move |req| {
            let page: usize = req.query_value("page").unwrap().parse().unwrap();
            if failing.contains(&page) {
                return Ok(HttpReply::new(500, "boom"));
            }
            let items: Vec<_> = if page <= total_pages {
                (0..per_page)
                    .map(|i| json!({"username": format!("user{page}_{i}")}))
                    .collect()
            } else {
                Vec::new()
            };
            let body = json!({"data": {"items": items, "has_more_data": page < total_pages}});
            Ok(HttpReply::new(200, body.to_string()))
        })
    }

    fn run(transport: &MockTransport, workers: usize) -> (CollectStats, Vec<Record>, usize) {
        let fetcher = PagedResourceFetcher::new(transport, "https://lms.example.com/manage/v1/user");
        let collector = ConcurrentPageCollector::new(fetcher, workers, 10);
        let calls = CallCounter::new();
        let mut dataset = Vec::new();
        let stats = collector
            .collect(
                DatasetKind::Users,
                &RecordFilter::default(),
                &Credential::new("tok"),
                &calls,
                &mut dataset,
                &ProgressBar::hidden(),
            )
            .unwrap();
        (stats, dataset, calls.get())
    }

    #[test]
    fn single_page_resource() {
        let transport = listing(1, 3, vec![]);
        let (stats, dataset, calls) = run(&transport, 4);
        assert_eq!(stats.batches, 1);
        assert_eq!(dataset.len(), 3);
        assert_eq!(calls, 4, "one call per worker slot");
    }

    #[test]
    fn batch_count_five_pages_two_workers() {
        let transport = listing(5, 2, vec![]);
        let (stats, dataset, calls) = run(&transport, 2);
        assert_eq!(stats.batches, 3);
        assert_eq!(dataset.len(), 10);
        assert_eq!(calls, 6);
        assert_eq!(transport.call_count(), calls);
    }

    #[test]
    fn batch_count_seven_pages_three_workers() {
        let transport = listing(7, 1, vec![]);
        let (stats, dataset, _) = run(&transport, 3);
        assert_eq!(stats.batches, 3);
        assert_eq!(dataset.len(), 7);
    }

    #[test]
    fn exact_multiple_needs_one_trailing_batch() {
        // Page 3 still reports more data, so the batch holding the last page
        // cannot end the run on its own.
        let transport = listing(4, 1, vec![]);
        let (stats, dataset, calls) = run(&transport, 2);
        assert_eq!(stats.batches, 3);
        assert_eq!(dataset.len(), 4);
        assert_eq!(calls, 6);
    }

    #[test]
    fn pages_past_end_are_accepted_empty() {
        let transport = listing(2, 1, vec![]);
        let (stats, _, _) = run(&transport, 4);
        assert_eq!(stats.pages_fetched, 4);
        assert_eq!(stats.pages_skipped, 0);
    }

    #[test]
    fn server_error_counts_as_empty_page() {
        // Page 1 of a one-page resource failing vs. page 2 (past the end) failing
        let failing = listing(1, 3, vec![2]);
        let (stats, with_failure, _) = run(&failing, 2);
        let clean = listing(1, 3, vec![]);
        let (_, without_failure, _) = run(&clean, 2);

        assert_eq!(stats.pages_skipped, 1);
        assert_eq!(stats.batches, 1, "a failed page never extends pagination");
        assert_eq!(with_failure.len(), without_failure.len());
    }

    #[test]
    fn failed_page_that_would_have_more_ends_run() {
        // Every page fails: the run stops after one batch with no data
        let transport = listing(10, 5, (1..=10).collect());
        let (stats, dataset, _) = run(&transport, 3);
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.pages_skipped, 3);
        assert!(dataset.is_empty());
    }

    #[test]
    fn internal_accounts_are_filtered_per_page() {
        let transport = MockTransport::new(|_| {
            let body = json!({"data": {"items": [
                {"username": "alice"},
                {"username": "onetrust_admin"}
            ], "has_more_data": false}});
            Ok(HttpReply::new(200, body.to_string()))
        });
        let (stats, dataset, _) = run(&transport, 1);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset[0]["username"], "alice");
        assert_eq!(stats.records_dropped, 1);
    }

    #[test]
    fn records_follow_completion_order_within_each_batch() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::{Arc, Mutex};
        use std::time::Duration;

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let events = Arc::new(Mutex::new(Vec::new()));
        let transport = {
            let (in_flight, peak, events) = (in_flight.clone(), peak.clone(), events.clone());
            MockTransport::new(move |req| {
                let page: usize = req.query_value("page").unwrap().parse().unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                events.lock().unwrap().push(("start", page));
                // Odd pages answer slowly, so each batch completes out of page order
                if page % 2 == 1 {
                    std::thread::sleep(Duration::from_millis(150));
                }
                let items: Vec<_> = if page <= 4 {
                    vec![json!({"username": format!("p{page}")})]
                } else {
                    Vec::new()
                };
                events.lock().unwrap().push(("end", page));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                let body = json!({"data": {"items": items, "has_more_data": page < 4}});
                Ok(HttpReply::new(200, body.to_string()))
            })
        };

        let (stats, dataset, _) = run(&transport, 2);
        let order: Vec<&str> = dataset
            .iter()
            .map(|r| r["username"].as_str().unwrap())
            .collect();
        assert_eq!(order, ["p2", "p1", "p4", "p3"]);
        assert_eq!(stats.batches, 3);
        assert!(peak.load(Ordering::SeqCst) <= 2);

        // Barrier: no page of a batch starts before every page of the
        // previous batch has ended
        let events = events.lock().unwrap();
        let position = |kind: &str, page: usize| {
            events
                .iter()
                .position(|&(k, p)| k == kind && p == page)
                .unwrap()
        };
        for (prev, next) in [([1, 2], [3, 4]), ([3, 4], [5, 6])] {
            let last_end = prev.iter().map(|&p| position("end", p)).max().unwrap();
            let first_start = next.iter().map(|&p| position("start", p)).min().unwrap();
            assert!(last_end < first_start, "batch {next:?} started early");
        }
    }

    #[test]
    fn zero_workers_clamped_to_one() {
        let transport = listing(1, 1, vec![]);
        let fetcher = PagedResourceFetcher::new(&transport, "u");
        assert_eq!(ConcurrentPageCollector::new(fetcher, 0, 10).workers(), 1);
    }
}
