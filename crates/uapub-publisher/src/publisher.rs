//! Publishing loop: one interval task per writer group.

use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use uapub_core::error::Result;

use crate::app_state::AppState;

/// Publish until `shutdown` resolves, then drain and join every group task.
pub async fn run<F>(state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let (stop_tx, _) = watch::channel(false);
    let mut tasks = JoinSet::new();

    for group in state.groups().iter().cloned() {
        let state = state.clone();
        let mut stop = stop_tx.subscribe();
        tasks.spawn(async move {
            let name = group.name().to_string();
            let mut ticker = time::interval(group.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            state.metrics().groups_running.inc(&[("group", name.as_str())]);
            tracing::info!(group = %name, "writer group started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop.changed() => break,
                }
                // A send blocked on a full transport must not hold up shutdown.
                // Failures are counted and logged inside publish_once.
                tokio::select! {
                    _ = group.publish_once(state.source(), state.transport(), state.metrics()) => {}
                    _ = stop.changed() => {
                        tracing::debug!(group = %name, "publish cycle abandoned on shutdown");
                        break;
                    }
                }
            }

            state.metrics().groups_running.dec(&[("group", name.as_str())]);
            tracing::info!(group = %name, "writer group stopped");
        });
    }

    shutdown.await;
    state.set_draining();
    tracing::info!(groups = tasks.len(), "shutdown requested, draining");
    let _ = stop_tx.send(true);

    while let Some(res) = tasks.join_next().await {
        if let Err(e) = res {
            tracing::warn!(error = %e, "writer group task failed");
        }
    }
    Ok(())
}
