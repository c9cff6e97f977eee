//! Background reconnect at a fixed interval.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Bridge;
use crate::error::BridgeError;

/// Stops the supervisor when told to, or when dropped.
#[derive(Debug)]
pub struct SupervisorHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SupervisorHandle {
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Bridge {
    /// Every `interval`, reconnect to the last good address if offline.
    ///
    /// Does nothing until the first successful connect has recorded an
    /// address. No backoff.
    pub fn spawn_reconnect_supervisor(&self, interval: Duration) -> SupervisorHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let bridge = self.clone();
        let interval = interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick fires immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match bridge.reconnect().await {
                    Ok(true) => info!("reconnected"),
                    Ok(false) => {}
                    Err(BridgeError::NotConnected) => {
                        debug!("no address to reconnect to yet");
                    }
                    Err(e) => warn!("reconnect attempt failed: {e}"),
                }
            }
            debug!("reconnect supervisor stopped");
        });

        SupervisorHandle {
            cancel,
            task: Some(task),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;

    #[tokio::test(start_paused = true)]
    async fn supervisor_stops_on_shutdown() {
        let bridge = Bridge::new(BridgeConfig::default());
        let handle = bridge.spawn_reconnect_supervisor(Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.is_running());

        handle.shutdown().await;
        assert!(bridge.state().is_disconnected());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_supervisor() {
        let bridge = Bridge::new(BridgeConfig::default());
        let handle = bridge.spawn_reconnect_supervisor(Duration::from_millis(50));
        let token = handle.cancel.clone();
        drop(handle);
        assert!(token.is_cancelled());
    }
}
