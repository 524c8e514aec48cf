//! Periodic alive-count reports

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::broker::BrokerError;

use super::config::AliveSource;
use super::core::{Shared, wait_stopped};

/// Report the alive count every `interval` until the run stops
///
/// The first report comes one full interval after start. Each report
/// carries the turn observed when the query was made.
pub(super) async fn alive_poller(shared: Arc<Shared>, interval: Duration, source: AliveSource) {
    debug!(?interval, ?source, "alive_poller: started");
    let mut stop_rx = shared.stop_tx.subscribe();
    let interval = interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = wait_stopped(&mut stop_rx) => break,
        }

        // A slow engine query must not hold up shutdown
        let report = tokio::select! {
            report = query_alive(&shared, source) => report,
            _ = wait_stopped(&mut stop_rx) => break,
        };
        match report {
            Ok((turn, count)) => shared.events.alive_count(turn, count),
            Err(e) => warn!(error = %e, "alive_poller: alive count query failed"),
        }
    }
    debug!("alive_poller: stopped");
}

async fn query_alive(shared: &Shared, source: AliveSource) -> Result<(usize, usize), BrokerError> {
    match source {
        AliveSource::Local => {
            let state = shared.state.lock().await;
            Ok((state.turn, state.grid.count_alive()))
        }
        AliveSource::Engine => {
            let turn = shared.state.lock().await.turn;
            let count = shared.engine.alive_count().await?;
            Ok((turn, count))
        }
    }
}
