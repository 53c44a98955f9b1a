use crate::client::PostcodeLookup;
use crate::types::{CoordinateRecord, EnrichmentResult};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

const PROGRESS_EVERY: usize = 20;

/// Runs one lookup per record over a bounded pool of concurrent workers.
///
/// Every input yields exactly one result, returned in input order even
/// though completion order is arbitrary. At most `max_workers` lookups are
/// in flight at any instant. Dropping the future aborts in-flight lookups.
pub async fn enrich_all(
    client: Arc<dyn PostcodeLookup>,
    records: &[CoordinateRecord],
    max_workers: usize,
) -> Vec<EnrichmentResult> {
    let total = records.len();
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut tasks: JoinSet<(usize, EnrichmentResult)> = JoinSet::new();

    for (index, &record) in records.iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let client = Arc::clone(&client);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore closed while dispatching");
            (index, client.lookup(record).await)
        });
    }

    // One slot per submitted record, filled as completions arrive
    let mut slots: Vec<Option<EnrichmentResult>> = vec![None; total];
    let mut completed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => error!("lookup worker failed: {}", e),
        }
        completed += 1;
        if completed % PROGRESS_EVERY == 0 {
            info!("{}/{} coordinates processed", completed, total);
        }
    }

    // A panicked worker leaves its slot empty; keep the record with a
    // failure entry so the result set stays complete.
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| EnrichmentResult::failed(records[index], "worker panicked"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubLookup {
        active: AtomicUsize,
        max_seen: AtomicUsize,
    }

    impl StubLookup {
        fn new() -> Self {
            Self {
                active: AtomicUsize::new(0),
                max_seen: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PostcodeLookup for StubLookup {
        async fn lookup(&self, coordinate: CoordinateRecord) -> EnrichmentResult {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            EnrichmentResult::found(coordinate, format!("PC{}", coordinate.lon as i64))
        }
    }

    fn records(n: usize) -> Vec<CoordinateRecord> {
        (0..n)
            .map(|i| CoordinateRecord::new(50.0, i as f64))
            .collect()
    }

    #[tokio::test]
    async fn test_every_record_yields_exactly_one_result() {
        for workers in [1, 3, 17] {
            let client = Arc::new(StubLookup::new());
            let input = records(23);
            let results = enrich_all(client, &input, workers).await;
            assert_eq!(results.len(), input.len());
        }
    }

    #[tokio::test]
    async fn test_results_come_back_in_input_order() {
        let client = Arc::new(StubLookup::new());
        let input = records(40);
        let results = enrich_all(client, &input, 8).await;
        for (record, result) in input.iter().zip(&results) {
            assert_eq!(result.coordinate, *record);
            assert_eq!(result.postcode(), Some(format!("PC{}", record.lon as i64).as_str()));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_worker_bound() {
        let client = Arc::new(StubLookup::new());
        let input = records(30);
        enrich_all(client.clone(), &input, 3).await;
        assert!(client.max_seen.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_single_worker_serializes_lookups() {
        let client = Arc::new(StubLookup::new());
        let input = records(10);
        enrich_all(client.clone(), &input, 1).await;
        assert_eq!(client.max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_input_completes_with_no_results() {
        let client = Arc::new(StubLookup::new());
        let results = enrich_all(client, &[], 17).await;
        assert!(results.is_empty());
    }
}
