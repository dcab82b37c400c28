use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::trace;

/// Collapses bursts of input updates into a single settled value.
///
/// Every call to [`Debouncer::update`] restarts the quiet period. Once the
/// input has been left alone for the whole period, the latest value is sent
/// on the settled channel, unless it equals the previously settled value.
/// Intermediate values are never queued.
pub struct Debouncer {
    input: watch::Sender<String>,
    task: JoinHandle<()>,
}

impl Debouncer {
    /// `initial` counts as already settled.
    pub fn spawn(initial: String, quiet: Duration) -> (Self, mpsc::Receiver<String>) {
        let (input, input_rx) = watch::channel(initial.clone());
        let (settled_tx, settled_rx) = mpsc::channel(8);

        let task = tokio::spawn(debounce_loop(input_rx, settled_tx, initial, quiet));

        (Self { input, task }, settled_rx)
    }

    pub fn update(&self, value: impl Into<String>) {
        self.input.send_replace(value.into());
    }

    /// The latest raw value, settled or not.
    pub fn current(&self) -> String {
        self.input.borrow().clone()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn debounce_loop(
    mut input: watch::Receiver<String>,
    settled: mpsc::Sender<String>,
    mut last_settled: String,
    quiet: Duration,
) {
    loop {
        if input.changed().await.is_err() {
            return;
        }

        // Wait for a full quiet period; each change starts it over.
        loop {
            tokio::select! {
                changed = input.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = tokio::time::sleep(quiet) => break,
            }
        }

        let value = input.borrow_and_update().clone();
        if value == last_settled {
            trace!(query = %value, "Settled on unchanged query");
            continue;
        }

        trace!(query = %value, "Query settled");
        last_settled = value.clone();
        if settled.send(value).await.is_err() {
            return;
        }
    }
}
