//! Background chunk generation on a fixed pool of worker threads.
//!
//! Requests go through a bounded queue, can be cancelled while pending, and
//! completed chunks come back through a bounded result channel. Workers call
//! [`TerrainEngine::generate_chunk`], so results land in the engine's cache.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tessera_config::WorkerConfig;

use crate::chunk::{Chunk, ChunkKey};
use crate::engine::TerrainEngine;
use crate::error::TerrainError;

/// A request to generate a single chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRequest {
    pub key: ChunkKey,
}

impl ChunkRequest {
    pub fn new(x: i64, z: i64, size: usize) -> Self {
        Self {
            key: ChunkKey::new(x, z, size),
        }
    }
}

/// The outcome of one request.
#[derive(Debug)]
pub struct GeneratedChunk {
    pub key: ChunkKey,
    pub result: Result<Arc<Chunk>, TerrainError>,
    /// Generation time in microseconds (for profiling).
    pub generation_time_us: u64,
    /// Cancellation flag of the submission this result answers.
    ticket: Arc<AtomicBool>,
}

struct QueuedRequest {
    request: ChunkRequest,
    cancelled: Arc<AtomicBool>,
}

/// Generates chunks for a shared [`TerrainEngine`] across a thread pool.
pub struct ChunkWorkerPool {
    task_sender: Sender<QueuedRequest>,
    result_receiver: Receiver<GeneratedChunk>,
    /// Cancellation flag per pending request.
    active_tasks: Arc<DashMap<ChunkKey, Arc<AtomicBool>>>,
    in_flight: Arc<AtomicU64>,
}

impl ChunkWorkerPool {
    /// Spawn `thread_count` workers (at least one).
    ///
    /// - `max_concurrent`: queue bound; submissions beyond it are rejected.
    /// - `result_capacity`: bound of the completed-chunk channel.
    pub fn new(
        engine: Arc<TerrainEngine>,
        thread_count: usize,
        max_concurrent: usize,
        result_capacity: usize,
    ) -> io::Result<Self> {
        let (task_sender, task_receiver) = bounded::<QueuedRequest>(max_concurrent.max(1));
        let (result_sender, result_receiver) = bounded::<GeneratedChunk>(result_capacity.max(1));
        let in_flight = Arc::new(AtomicU64::new(0));

        for _ in 0..thread_count.max(1) {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);
            let engine = Arc::clone(&engine);

            std::thread::Builder::new()
                .name("chunk-gen-worker".into())
                .spawn(move || {
                    while let Ok(queued) = receiver.recv() {
                        if queued.cancelled.load(Ordering::Relaxed) {
                            in_flight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }

                        let key = queued.request.key;
                        let start = Instant::now();
                        let result = engine.generate_chunk(key.x, key.z, key.size);
                        let elapsed = start.elapsed().as_micros() as u64;

                        if !queued.cancelled.load(Ordering::Relaxed) {
                            let _ = sender.send(GeneratedChunk {
                                key,
                                result,
                                generation_time_us: elapsed,
                                ticket: queued.cancelled,
                            });
                        }

                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })?;
        }

        Ok(Self {
            task_sender,
            result_receiver,
            active_tasks: Arc::new(DashMap::new()),
            in_flight,
        })
    }

    /// Pool sized to the machine: `num_cpus - 2` workers, at least one.
    pub fn with_defaults(engine: Arc<TerrainEngine>) -> io::Result<Self> {
        Self::new(engine, default_threads(), 64, 128)
    }

    /// Pool sized by application settings; `threads == 0` picks the default.
    pub fn from_config(engine: Arc<TerrainEngine>, config: &WorkerConfig) -> io::Result<Self> {
        let threads = if config.threads == 0 {
            default_threads()
        } else {
            config.threads
        };
        Self::new(engine, threads, config.max_concurrent, config.result_capacity)
    }

    /// Queue a request.
    ///
    /// Returns `Err(request)` if the queue is full or a request for the same
    /// key is still pending (queued, running, or completed but not drained).
    pub fn submit(&self, request: ChunkRequest) -> Result<(), ChunkRequest> {
        let cancelled = Arc::new(AtomicBool::new(false));
        match self.active_tasks.entry(request.key) {
            Entry::Occupied(_) => return Err(request),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&cancelled));
            }
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        self.task_sender
            .try_send(QueuedRequest { request, cancelled })
            .map_err(|e| {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                let request = e.into_inner().request;
                self.active_tasks.remove(&request.key);
                request
            })
    }

    /// Cancel a pending or running request. A no-op once it has completed.
    pub fn cancel(&self, key: &ChunkKey) {
        if let Some((_, cancelled)) = self.active_tasks.remove(key) {
            cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Take every completed result without blocking.
    pub fn drain_results(&self) -> Vec<GeneratedChunk> {
        let mut results = Vec::new();
        while let Ok(generated) = self.result_receiver.try_recv() {
            // A resubmission after cancel owns a different flag; keep it.
            self.active_tasks
                .remove_if(&generated.key, |_, flag| Arc::ptr_eq(flag, &generated.ticket));
            results.push(generated);
        }
        results
    }

    /// Requests queued or executing.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Whether a request for `key` is pending.
    pub fn is_pending(&self, key: &ChunkKey) -> bool {
        self.active_tasks.contains_key(key)
    }
}

fn default_threads() -> usize {
    let cpus = num_cpus::get().max(2);
    (cpus - 2).max(1)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::EngineOptions;
    use crate::profile::ProfileRegistry;

    const PROFILES: &str = r#"(
        terrain_types: {
            "dunes": (
                height_range: (0.0, 60.0),
                noise_algorithms: [(kind: dune, frequency: 0.04)],
                conditions: Default,
            ),
        },
    )"#;

    fn engine() -> Arc<TerrainEngine> {
        Arc::new(TerrainEngine::new(
            42,
            ProfileRegistry::from_ron(PROFILES).unwrap(),
            EngineOptions::default(),
        ))
    }

    fn collect(pool: &ChunkWorkerPool, expected: usize) -> Vec<GeneratedChunk> {
        let mut results = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(30);
        while results.len() < expected && Instant::now() < deadline {
            results.extend(pool.drain_results());
            if results.len() < expected {
                std::thread::sleep(Duration::from_millis(10));
            }
        }
        results
    }

    #[test]
    fn test_concurrent_generation_is_safe() {
        let pool = ChunkWorkerPool::new(engine(), 4, 64, 64).unwrap();

        let mut submitted = 0;
        for x in 0..6_i64 {
            for z in 0..6_i64 {
                if pool.submit(ChunkRequest::new(x, z, 16)).is_ok() {
                    submitted += 1;
                }
            }
        }

        let results = collect(&pool, submitted);
        assert_eq!(
            results.len(),
            submitted,
            "Should receive all submitted chunks: got {}/{submitted}",
            results.len()
        );
        assert!(results.iter().all(|r| r.result.is_ok()));
    }

    #[test]
    fn test_pool_results_match_direct_generation() {
        let engine = engine();
        let pool = ChunkWorkerPool::new(Arc::clone(&engine), 2, 8, 8).unwrap();
        pool.submit(ChunkRequest::new(3, -1, 12)).unwrap();

        let results = collect(&pool, 1);
        let pooled = results[0].result.as_ref().unwrap();
        let direct = engine.generate_uncached(3, -1, 12).unwrap();
        assert_eq!(pooled.height_grid, direct.height_grid);
    }

    #[test]
    fn test_errors_are_delivered() {
        let pool = ChunkWorkerPool::new(engine(), 1, 8, 8).unwrap();
        pool.submit(ChunkRequest::new(0, 0, 0)).unwrap();
        let results = collect(&pool, 1);
        assert!(matches!(
            results[0].result,
            Err(TerrainError::InvalidChunkRequest(_))
        ));
    }

    #[test]
    fn test_cancellation_clears_pending() {
        let pool = ChunkWorkerPool::new(engine(), 1, 64, 64).unwrap();
        let request = ChunkRequest::new(50, 50, 32);
        let _ = pool.submit(request);
        assert!(pool.is_pending(&request.key));

        pool.cancel(&request.key);
        assert!(!pool.is_pending(&request.key));
        // The worker may already have finished; either outcome is acceptable.
        std::thread::sleep(Duration::from_millis(200));
        let _ = pool.drain_results();
    }

    #[test]
    fn test_duplicate_pending_key_rejected() {
        let pool = ChunkWorkerPool::new(engine(), 1, 8, 8).unwrap();
        let request = ChunkRequest::new(4, 4, 16);
        pool.submit(request).unwrap();
        assert_eq!(pool.submit(request), Err(request));

        let results = collect(&pool, 1);
        assert_eq!(results.len(), 1);
        assert!(!pool.is_pending(&request.key));

        // Once drained, the key can be requested again and cancelled.
        pool.submit(request).unwrap();
        assert!(pool.is_pending(&request.key));
        pool.cancel(&request.key);
        assert!(!pool.is_pending(&request.key));
    }

    #[test]
    fn test_full_queue_rejects() {
        let pool = ChunkWorkerPool::new(engine(), 1, 1, 1).unwrap();
        let rejected = (0..16_i64)
            .filter(|&x| pool.submit(ChunkRequest::new(x, 0, 256)).is_err())
            .count();
        assert!(rejected > 0, "a one-slot queue should reject a burst of 16");
    }

    #[test]
    fn test_in_flight_count() {
        let pool = ChunkWorkerPool::new(engine(), 1, 64, 64).unwrap();
        assert_eq!(pool.in_flight_count(), 0);

        for i in 0..5_i64 {
            let _ = pool.submit(ChunkRequest::new(i, 0, 128));
        }
        assert!(pool.in_flight_count() > 0);

        let deadline = Instant::now() + Duration::from_secs(10);
        while pool.in_flight_count() > 0 && Instant::now() < deadline {
            let _ = pool.drain_results();
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(pool.in_flight_count(), 0);
    }
}
