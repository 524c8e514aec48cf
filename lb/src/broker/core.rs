//! Broker - partitions each turn across the worker pool
//!
//! The broker owns two pieces of state, each behind its own lock:
//! - the ordered worker registry, copied as an immutable snapshot per turn
//! - a mirror of the most recent grid, answering alive-count queries
//!
//! Neither lock is held while a worker call is in flight.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::{Band, Grid, Row, Task, partition};
use crate::rpc::RpcConfig;

use super::config::FailurePolicy;
use super::error::{BandError, BrokerError};
use super::registry::{BandWorker, RemoteWorker, WorkerEntry};

/// Fan-out/fan-in turn executor with a cached grid mirror
pub struct Broker {
    registry: RwLock<Vec<WorkerEntry>>,
    cache: Mutex<Option<Grid>>,
    policy: FailurePolicy,
    rpc: RpcConfig,
}

impl Broker {
    pub fn new(policy: FailurePolicy, rpc: RpcConfig) -> Self {
        debug!(%policy, "Broker::new: called");
        Self {
            registry: RwLock::new(Vec::new()),
            cache: Mutex::new(None),
            policy,
            rpc,
        }
    }

    /// Append a worker; its index fixes the band it receives
    pub async fn register(&self, worker: Arc<dyn BandWorker>) -> usize {
        let mut registry = self.registry.write().await;
        let index = registry.len();
        info!(index, address = %worker.address(), "Worker registered");
        registry.push(WorkerEntry { index, worker });
        index
    }

    /// Register a remote worker after checking that it answers a ping
    pub async fn register_address(&self, address: &str) -> Result<usize, BrokerError> {
        debug!(%address, "register_address: called");
        let worker = RemoteWorker::new(address, self.rpc.clone());
        worker
            .client()
            .ping()
            .await
            .map_err(|source| BrokerError::Registration {
                address: address.to_string(),
                source,
            })?;
        Ok(self.register(Arc::new(worker)).await)
    }

    /// Register each address in order, skipping unreachable workers
    pub async fn register_all(&self, addresses: &[String]) -> usize {
        let mut registered = 0;
        for address in addresses {
            match self.register_address(address).await {
                Ok(_) => registered += 1,
                Err(e) => warn!(%address, error = %e, "Skipping worker"),
            }
        }
        registered
    }

    pub async fn worker_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Copy of the registry in band order
    pub async fn workers(&self) -> Vec<WorkerEntry> {
        self.registry.read().await.clone()
    }

    /// Live cells in the cached grid; 0 before the first turn
    pub async fn alive_count(&self) -> usize {
        self.cache.lock().await.as_ref().map_or(0, Grid::count_alive)
    }

    /// Compute the next generation of `grid` across the worker pool
    pub async fn advance_turn(&self, grid: Grid) -> Result<Grid, BrokerError> {
        let workers: Arc<[WorkerEntry]> = self.workers().await.into();
        if workers.is_empty() {
            return Err(BrokerError::NoWorkers);
        }
        debug!(
            width = grid.width(),
            height = grid.height(),
            workers = workers.len(),
            "advance_turn: called"
        );

        *self.cache.lock().await = Some(grid.clone());

        let bands = partition(grid.height(), workers.len());
        let mut in_flight = JoinSet::new();
        for (i, band) in bands.iter().copied().enumerate() {
            if band.height() == 0 {
                continue;
            }
            let task = Task::for_band(&grid, band);
            let workers = workers.clone();
            let policy = self.policy;
            let width = grid.width();
            in_flight.spawn(async move { (band, dispatch_band(&workers, i, task, width, policy).await) });
        }

        // Unfinished bands keep their input rows; only best-effort ever returns them
        let (width, height) = (grid.width(), grid.height());
        let mut rows: Vec<Row> = grid.into_rows();
        let mut failure = None;
        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok((band, Ok(band_rows))) => {
                    for (offset, row) in band_rows.into_iter().enumerate() {
                        rows[band.start_y + offset] = row;
                    }
                }
                Ok((band, Err((address, source)))) => {
                    if self.policy == FailurePolicy::BestEffort && !source.is_invalid_task() {
                        warn!(
                            start_y = band.start_y,
                            end_y = band.end_y,
                            %address,
                            error = %source,
                            "advance_turn: band failed, keeping previous rows"
                        );
                        continue;
                    }
                    warn!(start_y = band.start_y, end_y = band.end_y, %address, error = %source, "advance_turn: band failed");
                    failure.get_or_insert(BrokerError::Band {
                        start_y: band.start_y,
                        end_y: band.end_y,
                        address,
                        source,
                    });
                }
                Err(e) => {
                    failure.get_or_insert(BrokerError::Internal(format!("band task aborted: {}", e)));
                }
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }

        let next = Grid::from_rows(width, height, rows)?;
        *self.cache.lock().await = Some(next.clone());
        debug!(alive = next.count_alive(), "advance_turn: merged");
        Ok(next)
    }

    /// Ask every registered worker to stop serving
    pub async fn shutdown_workers(&self) {
        let workers = self.workers().await;
        info!(count = workers.len(), "Shutting down workers");
        join_all(workers.iter().map(|entry| entry.worker.shutdown())).await;
    }
}

/// Run one band, re-dispatching to the following workers under the retry policy
async fn dispatch_band(
    workers: &[WorkerEntry],
    index: usize,
    task: Task,
    width: usize,
    policy: FailurePolicy,
) -> Result<Vec<Row>, (String, BandError)> {
    let attempts = match policy {
        FailurePolicy::Retry { attempts } => attempts as usize + 1,
        _ => 1,
    };
    let band = task.band();
    let mut last = None;
    for attempt in 0..attempts {
        let entry = &workers[(index + attempt) % workers.len()];
        let error = match entry.worker.compute(task.clone()).await {
            Ok(rows) => match check_rows(band, width, &rows) {
                Ok(()) => return Ok(rows),
                Err(e) => e,
            },
            Err(e) => e,
        };
        if error.is_invalid_task() {
            return Err((entry.address().to_string(), error));
        }
        if attempt + 1 < attempts {
            warn!(address = %entry.address(), attempt, error = %error, "dispatch_band: re-dispatching band");
        }
        last = Some((entry.address().to_string(), error));
    }
    Err(last.unwrap_or_else(|| (String::new(), BandError::Transport("band was never dispatched".to_string()))))
}

fn check_rows(band: Band, width: usize, rows: &[Row]) -> Result<(), BandError> {
    if rows.len() != band.height() {
        return Err(BandError::Malformed(format!(
            "expected {} rows, got {}",
            band.height(),
            rows.len()
        )));
    }
    if let Some(row) = rows.iter().find(|r| r.len() != width) {
        return Err(BandError::Malformed(format!(
            "expected row width {}, got {}",
            width,
            row.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::LocalWorker;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Worker that fails every call with a transport error
    struct DeadWorker {
        calls: AtomicUsize,
    }

    impl DeadWorker {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BandWorker for DeadWorker {
        fn address(&self) -> &str {
            "dead"
        }

        async fn compute(&self, _task: Task) -> Result<Vec<Row>, BandError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BandError::Transport("connection refused".to_string()))
        }
    }

    /// Worker that returns the wrong number of rows
    struct ShortWorker;

    #[async_trait]
    impl BandWorker for ShortWorker {
        fn address(&self) -> &str {
            "short"
        }

        async fn compute(&self, _task: Task) -> Result<Vec<Row>, BandError> {
            Ok(Vec::new())
        }
    }

    fn glider() -> Grid {
        Grid::parse(&[".#..", "..#.", "###.", "...."]).unwrap()
    }

    async fn broker_with(policy: FailurePolicy, workers: Vec<Arc<dyn BandWorker>>) -> Broker {
        let broker = Broker::new(policy, RpcConfig::default());
        for worker in workers {
            broker.register(worker).await;
        }
        broker
    }

    fn local(n: usize) -> Vec<Arc<dyn BandWorker>> {
        (0..n)
            .map(|i| Arc::new(LocalWorker::new(format!("local-{}", i))) as Arc<dyn BandWorker>)
            .collect()
    }

    #[tokio::test]
    async fn test_no_workers_fails_turn() {
        let broker = Broker::new(FailurePolicy::FailFast, RpcConfig::default());
        let err = broker.advance_turn(glider()).await.unwrap_err();
        assert!(matches!(err, BrokerError::NoWorkers));
        assert_eq!(broker.alive_count().await, 0);
    }

    #[tokio::test]
    async fn test_glider_two_workers_matches_reference() {
        let broker = broker_with(FailurePolicy::FailFast, local(2)).await;
        let next = broker.advance_turn(glider()).await.unwrap();
        assert_eq!(next, glider().next_generation());
    }

    #[tokio::test]
    async fn test_any_worker_count_matches_reference() {
        let grid = Grid::parse(&["#..#.", ".##..", "#...#", "..#.#", ".#...", "##..."]).unwrap();
        for n in 1..=8 {
            let broker = broker_with(FailurePolicy::FailFast, local(n)).await;
            let next = broker.advance_turn(grid.clone()).await.unwrap();
            assert_eq!(next, grid.next_generation(), "workers = {}", n);
        }
    }

    #[tokio::test]
    async fn test_alive_count_tracks_cache() {
        let broker = broker_with(FailurePolicy::FailFast, local(2)).await;
        assert_eq!(broker.alive_count().await, 0);
        let next = broker.advance_turn(glider()).await.unwrap();
        assert_eq!(broker.alive_count().await, next.count_alive());
    }

    #[tokio::test]
    async fn test_all_dead_grid_counts_zero() {
        let broker = broker_with(FailurePolicy::FailFast, local(2)).await;
        let dead = Grid::new(4, 4).unwrap();
        assert_eq!(broker.alive_count().await, 0);
        let next = broker.advance_turn(dead.clone()).await.unwrap();
        assert_eq!(next, dead);
        assert_eq!(broker.alive_count().await, 0);
    }

    #[tokio::test]
    async fn test_fail_fast_reports_band() {
        let mut workers = local(1);
        workers.push(Arc::new(DeadWorker::new()));
        let broker = broker_with(FailurePolicy::FailFast, workers).await;
        let err = broker.advance_turn(glider()).await.unwrap_err();
        match err {
            BrokerError::Band {
                start_y,
                end_y,
                address,
                ..
            } => {
                assert_eq!((start_y, end_y), (2, 4));
                assert_eq!(address, "dead");
            }
            other => panic!("Expected band failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_best_effort_keeps_input_rows() {
        let mut workers = local(1);
        workers.push(Arc::new(DeadWorker::new()));
        let broker = broker_with(FailurePolicy::BestEffort, workers).await;
        let grid = glider();
        let next = broker.advance_turn(grid.clone()).await.unwrap();
        let reference = grid.next_generation();
        assert_eq!(&next.rows()[0..2], &reference.rows()[0..2]);
        assert_eq!(&next.rows()[2..4], &grid.rows()[2..4]);
    }

    #[tokio::test]
    async fn test_retry_redispatches_to_next_worker() {
        let dead = Arc::new(DeadWorker::new());
        let workers: Vec<Arc<dyn BandWorker>> = vec![dead.clone(), Arc::new(LocalWorker::new("local"))];
        let broker = broker_with(FailurePolicy::Retry { attempts: 1 }, workers).await;
        let next = broker.advance_turn(glider()).await.unwrap();
        assert_eq!(next, glider().next_generation());
        assert_eq!(dead.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_exhausted_fails_turn() {
        let dead = Arc::new(DeadWorker::new());
        let broker = broker_with(FailurePolicy::Retry { attempts: 2 }, vec![dead.clone()]).await;
        assert!(broker.advance_turn(glider()).await.is_err());
        assert_eq!(dead.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_malformed_reply_fails_turn() {
        let broker = broker_with(FailurePolicy::FailFast, vec![Arc::new(ShortWorker)]).await;
        let err = broker.advance_turn(glider()).await.unwrap_err();
        assert!(matches!(
            err,
            BrokerError::Band {
                source: BandError::Malformed(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_more_workers_than_rows() {
        let grid = Grid::parse(&["###", "...", "..."]).unwrap();
        let broker = broker_with(FailurePolicy::FailFast, local(5)).await;
        let next = broker.advance_turn(grid.clone()).await.unwrap();
        assert_eq!(next, grid.next_generation());
    }

    #[tokio::test]
    async fn test_registry_preserves_order() {
        let broker = broker_with(FailurePolicy::FailFast, local(3)).await;
        let workers = broker.workers().await;
        let addresses: Vec<_> = workers.iter().map(|w| (w.index, w.address().to_string())).collect();
        assert_eq!(
            addresses,
            vec![
                (0, "local-0".to_string()),
                (1, "local-1".to_string()),
                (2, "local-2".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_register_unreachable_address_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let rpc = RpcConfig {
            timeout_ms: 500,
            retries: 0,
            ..Default::default()
        };
        let broker = Broker::new(FailurePolicy::FailFast, rpc);
        assert!(matches!(
            broker.register_address(&addr).await,
            Err(BrokerError::Registration { .. })
        ));
        assert_eq!(broker.register_all(&[addr]).await, 0);
        assert_eq!(broker.worker_count().await, 0);
    }
}
