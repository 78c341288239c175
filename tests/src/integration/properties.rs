//! # Randomized Ordering Properties
//!
//! Seeded random workloads on a multi-threaded runtime. Every run is
//! checked against the ordering invariants from `order_gate::domain::invariants`.

#[cfg(test)]
mod tests {
    use crate::integration::support::{admit, gate, settle, single, tx, Step, Tx};
    use async_trait::async_trait;
    use order_gate::domain::invariants::invariant_per_document_fifo;
    use order_gate::{
        BatchProcessor, DocumentId, EmbeddedDocumentResolver, OrderingGate, OrderingGateApi,
        Transaction, TransactionBatch,
    };
    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::{BTreeSet, HashMap};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const DOCUMENTS: usize = 6;

    // =============================================================================
    // FIXTURES
    // =============================================================================

    /// One to three transactions spread over random documents.
    fn random_batch(rng: &mut StdRng, admission: usize, failure_rate: f64) -> TransactionBatch<Tx> {
        let step = Step {
            admission,
            delay_ms: rng.gen_range(0..6),
            fail: rng.gen_bool(failure_rate),
        };
        (0..rng.gen_range(1..=3))
            .map(|_| {
                let document = format!("doc-{}", rng.gen_range(0..DOCUMENTS));
                tx(&document, rng.gen_range(0..1_000), step.clone())
            })
            .collect()
    }

    /// Downstream that counts concurrent calls per document and flags any
    /// moment where two calls hold the same document.
    #[derive(Clone, Default)]
    struct OverlapDetector {
        in_flight: Arc<Mutex<HashMap<DocumentId, usize>>>,
        overlap: Arc<AtomicBool>,
        calls: Arc<AtomicUsize>,
    }

    /// Leaves the in-flight count even when the call is dropped mid-way.
    struct InFlight {
        detector: OverlapDetector,
        documents: Vec<DocumentId>,
    }

    impl Drop for InFlight {
        fn drop(&mut self) {
            let mut in_flight = self.detector.in_flight.lock();
            for document in &self.documents {
                if let Some(count) = in_flight.get_mut(document) {
                    *count -= 1;
                }
            }
        }
    }

    impl OverlapDetector {
        fn enter(&self, documents: Vec<DocumentId>) -> InFlight {
            let mut in_flight = self.in_flight.lock();
            for document in &documents {
                let count = in_flight.entry(document.clone()).or_insert(0);
                *count += 1;
                if *count > 1 {
                    self.overlap.store(true, Ordering::SeqCst);
                }
            }
            InFlight {
                detector: self.clone(),
                documents,
            }
        }

        fn all_idle(&self) -> bool {
            self.in_flight.lock().values().all(|count| *count == 0)
        }
    }

    #[async_trait]
    impl BatchProcessor<Tx> for OverlapDetector {
        type Output = usize;
        type Error = String;

        async fn process(&self, batch: TransactionBatch<Tx>) -> Result<usize, String> {
            let documents: BTreeSet<DocumentId> =
                batch.iter().filter_map(|tx| tx.document_id.clone()).collect();
            let _in_flight = self.enter(documents.into_iter().collect());

            let delay = batch.iter().map(|tx| tx.payload.delay_ms).max().unwrap_or(0);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            } else {
                tokio::task::yield_now().await;
            }

            self.calls.fetch_add(1, Ordering::SeqCst);
            if batch.iter().any(|tx| tx.payload.fail) {
                return Err("boom".to_string());
            }
            Ok(batch.len())
        }
    }

    // =============================================================================
    // PROPERTIES
    // =============================================================================

    /// Hundreds of submits spawned straight onto worker threads, so
    /// registration itself races. Calls on one document never overlap
    /// downstream, including when some submissions are aborted.
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_parallel_submits_never_overlap_on_a_document() {
        let detector = OverlapDetector::default();
        let gate = Arc::new(OrderingGate::<Tx, _, _>::new(
            detector.clone(),
            EmbeddedDocumentResolver,
        ));

        let handles: Vec<_> = (0..400usize)
            .map(|i| {
                let step = Step {
                    admission: i,
                    delay_ms: (i % 3) as u64,
                    fail: i % 11 == 0,
                };
                let mut transactions = vec![tx("doc-1", i as u64, step.clone())];
                if i % 3 == 0 {
                    transactions.push(tx("doc-2", i as u64, step));
                }
                let gate = Arc::clone(&gate);
                tokio::spawn(async move { gate.submit(TransactionBatch::new(transactions)).await })
            })
            .collect();

        let mut kept = Vec::new();
        for (i, handle) in handles.into_iter().enumerate() {
            if i % 7 == 0 {
                handle.abort();
            } else {
                kept.push(handle);
            }
        }

        let kept_count = kept.len();
        timeout(Duration::from_secs(20), async {
            for handle in kept {
                let _ = handle.await.expect("submission task panicked");
            }
            while !gate.tracker().is_idle() || gate.metrics().snapshot().batches_in_flight() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("parallel submits did not drain");

        assert!(
            !detector.overlap.load(Ordering::SeqCst),
            "two downstream calls held the same document at once"
        );
        assert!(detector.all_idle());
        assert!(detector.calls.load(Ordering::SeqCst) > 0);

        // An aborted task may never have been polled, so it never submitted.
        let snapshot = gate.metrics().snapshot();
        assert!((kept_count as u64..=400).contains(&snapshot.batches_submitted));
        assert_eq!(
            snapshot.batches_completed + snapshot.batches_failed + snapshot.batches_abandoned,
            snapshot.batches_submitted
        );
    }


    /// Random batches, random latencies, random failures: per-document FIFO
    /// holds and the tracker drains.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_random_load_keeps_per_document_fifo() {
        for seed in 0..5u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (gate, recorder) = gate();

            let mut submitted = HashMap::new();
            let mut handles = Vec::new();
            for admission in 0..60 {
                let batch = random_batch(&mut rng, admission, 0.15);
                let ids: Vec<_> = batch.iter().map(|tx| tx.id).collect();
                submitted.insert(ids[0], ids);
                handles.push(admit(&gate, batch).await);
            }
            for handle in handles {
                let _ = settle(handle).await;
            }

            assert!(
                invariant_per_document_fifo(&recorder.spans()),
                "FIFO violated for seed {seed}"
            );

            // Every batch went downstream exactly once, whole.
            let released = recorder.released();
            assert_eq!(released.len(), 60);
            for ids in released {
                assert_eq!(submitted.get(&ids[0]), Some(&ids));
            }

            let snapshot = gate.metrics().snapshot();
            assert_eq!(snapshot.batches_completed + snapshot.batches_failed, 60);
            assert_eq!(snapshot.batches_in_flight(), 0);
            assert!(gate.tracker().is_idle());
        }
    }

    /// Aborting random submissions, waiting or in flight, never lets a later
    /// batch overlap an earlier one that did run, and never wedges a document.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_random_aborts_keep_fifo_and_drain() {
        let mut rng = StdRng::seed_from_u64(42);
        let (gate, recorder) = gate();

        let mut handles = Vec::new();
        for admission in 0..40 {
            let batch = random_batch(&mut rng, admission, 0.0);
            handles.push(admit(&gate, batch).await);
        }

        let mut kept = Vec::new();
        for handle in handles {
            if rng.gen_bool(0.25) {
                handle.abort();
            } else {
                kept.push(handle);
            }
        }
        for handle in kept {
            settle(handle).await.unwrap();
        }

        // Aborted tasks resolve their tickets when dropped, which can lag the abort.
        timeout(Duration::from_secs(2), async {
            while !gate.tracker().is_idle() || gate.metrics().snapshot().batches_in_flight() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("tracker did not drain after aborts");

        assert!(invariant_per_document_fifo(&recorder.spans()));
        let snapshot = gate.metrics().snapshot();
        assert_eq!(
            snapshot.batches_completed + snapshot.batches_failed + snapshot.batches_abandoned,
            40
        );
    }

    /// A batch with no document target is not held behind anything.
    #[tokio::test]
    async fn test_unrouted_batch_bypasses_ordering() {
        let (gate, recorder) = gate();

        let slow = admit(&gate, single("doc-1", 0, 200)).await;
        let unrouted = TransactionBatch::single(Transaction::unrouted(
            7,
            Step {
                admission: 1,
                delay_ms: 0,
                fail: false,
            },
        ));
        let bypass = admit(&gate, unrouted).await;

        timeout(Duration::from_millis(100), bypass)
            .await
            .expect("unrouted batch waited")
            .unwrap()
            .unwrap();
        assert_eq!(gate.metrics().snapshot().transactions_bypassed, 1);

        settle(slow).await.unwrap();
        assert_eq!(recorder.completion_order(), vec![1, 0]);
    }
}
