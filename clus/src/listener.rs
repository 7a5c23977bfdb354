//! Background failover listener.
//!
//! Polls the failover monitor on a fixed interval. The monitor blocks, so
//! each poll runs on the blocking pool; an error or panic in one poll is
//! logged and the next tick polls again.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::ops::ClusterOps;

/// Floor for the poll interval; a zero period would spin.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) async fn run(ops: Arc<ClusterOps>, period: Duration) {
    let period = period.max(MIN_POLL_INTERVAL);
    info!(
        node = %ops.this_node(),
        interval_ms = period.as_millis() as u64,
        "Starting failover listener"
    );

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let ops = Arc::clone(&ops);
        match tokio::task::spawn_blocking(move || ops.poll_failover_events()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failover observation failed, will retry"),
            Err(e) => error!(error = %e, "Failover observation aborted"),
        }
    }
}
