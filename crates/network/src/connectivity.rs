// crates/network/src/connectivity.rs
//! Reachability monitoring for the API server

use crate::error::{NetworkError, NetworkResult};
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Periodically probes a URL and publishes whether it answered
#[derive(Clone)]
pub struct ConnectivityMonitor {
    client: ReqwestClient,
    probe_url: String,
    interval: Duration,
}

impl ConnectivityMonitor {
    /// Creates a monitor probing `probe_url` every `interval`
    pub fn new(probe_url: impl Into<String>, interval: Duration) -> NetworkResult<Self> {
        let probe_url = probe_url.into();
        reqwest::Url::parse(&probe_url)
            .map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", probe_url, e)))?;

        let client = ReqwestClient::builder()
            .timeout(interval.max(Duration::from_secs(1)))
            .build()?;

        Ok(Self {
            client,
            probe_url,
            interval,
        })
    }

    /// Probes once
    ///
    /// Any HTTP answer counts as reachable, including error statuses:
    /// the server is up even if it refuses an unauthenticated HEAD.
    pub async fn is_online(&self) -> bool {
        match self.client.head(&self.probe_url).send().await {
            Ok(_) => true,
            Err(e) => {
                log::trace!("Connectivity probe failed: {}", e);
                false
            }
        }
    }

    /// Probes once, then keeps probing in the background
    ///
    /// The returned watch only changes on transitions. The background task
    /// stops once every receiver is dropped or [`ConnectivityWatch::stop`]
    /// is called.
    pub async fn start(self) -> ConnectivityWatch {
        let initial = self.is_online().await;
        let (sender, receiver) = watch::channel(initial);
        log::info!(
            "Server {} at start-up",
            if initial { "reachable" } else { "unreachable" }
        );

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sender.closed() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }

                let online = self.is_online().await;
                let changed = sender.send_if_modified(|current| {
                    if *current == online {
                        false
                    } else {
                        *current = online;
                        true
                    }
                });
                if changed {
                    log::info!("Server became {}", if online { "reachable" } else { "unreachable" });
                }
            }
            log::debug!("Connectivity monitor stopped");
        });

        ConnectivityWatch { receiver, task }
    }
}

/// Handle to a running [`ConnectivityMonitor`]
pub struct ConnectivityWatch {
    receiver: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl ConnectivityWatch {
    /// Returns a receiver of connectivity transitions
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.receiver.clone()
    }

    /// Last observed state
    pub fn is_online(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Stops probing
    pub fn stop(self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_rejects_invalid_url() {
        let result = ConnectivityMonitor::new("::nope::", Duration::from_secs(5));
        assert!(matches!(result, Err(NetworkError::InvalidUrl(_))));
    }

    #[test]
    fn test_single_probe_of_closed_port() {
        let monitor =
            ConnectivityMonitor::new("http://127.0.0.1:9/", Duration::from_millis(50)).unwrap();
        assert!(!tokio_test::block_on(monitor.is_online()));
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_offline() {
        // Port 9 (discard) is closed on test machines
        let monitor =
            ConnectivityMonitor::new("http://127.0.0.1:9/", Duration::from_millis(50)).unwrap();
        let watch = monitor.start().await;
        assert!(!watch.is_online());
        watch.stop();
    }
}
