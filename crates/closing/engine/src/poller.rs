//! Background status synchronization
//!
//! While a sale sits at the Send step the poller fetches the remote
//! contract on a fixed interval and folds each snapshot into the shared
//! view. It terminates itself once the contract is signed and delivery
//! has resolved, and can be stopped or aborted from the handle at any
//! point. A failed poll is logged and retried on the next tick; polling
//! never gives up on its own before the sale settles.

use crate::config::PollerConfig;
use crate::view::SaleView;
use closing_client::ContractService;
use closing_types::SaleEvent;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

/// What a single poll concluded about the loop's future
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The sale is still unsettled; keep polling
    Continue,
    /// Nothing left to observe; the loop can end
    Finished,
}

/// Polls the contract service and keeps the shared view current.
pub struct StatusPoller {
    service: Arc<dyn ContractService>,
    view: Arc<RwLock<SaleView>>,
    events: broadcast::Sender<SaleEvent>,
    config: PollerConfig,
    running: Arc<RwLock<bool>>,
}

impl StatusPoller {
    pub fn new(
        service: Arc<dyn ContractService>,
        view: Arc<RwLock<SaleView>>,
        events: broadcast::Sender<SaleEvent>,
        config: PollerConfig,
    ) -> Self {
        Self {
            service,
            view,
            events,
            config,
            // Armed from construction so a stop() racing the spawned task
            // can never be overwritten back to running.
            running: Arc::new(RwLock::new(true)),
        }
    }

    /// Start the polling loop on the runtime and hand back its controls.
    pub fn spawn(self) -> PollerHandle {
        let running = self.running.clone();
        let handle = tokio::spawn(async move {
            self.run().await;
        });
        PollerHandle { running, handle }
    }

    async fn run(self) {
        let mut interval = interval(Duration::from_millis(self.config.interval_ms));

        tracing::debug!(interval_ms = self.config.interval_ms, "Status poller started");

        loop {
            interval.tick().await;

            {
                let running = self.running.read().await;
                if !*running {
                    break;
                }
            }

            if self.tick().await == TickOutcome::Finished {
                break;
            }
        }

        let mut running = self.running.write().await;
        *running = false;
        tracing::debug!("Status poller stopped");
    }

    /// Perform one poll: fetch the remote snapshot, fold it into the view,
    /// broadcast observed transitions.
    pub async fn tick(&self) -> TickOutcome {
        let contract_id = {
            let view = self.view.read().await;
            if !view.polling_required() {
                return TickOutcome::Finished;
            }
            match view.contract() {
                Some(contract) => contract.id.clone(),
                None => return TickOutcome::Finished,
            }
        };

        // The view lock is not held across the fetch.
        let remote = match self.service.get(&contract_id).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(contract_id = %contract_id, error = %e, "Status poll failed");
                return TickOutcome::Continue;
            }
        };

        let (events, still_required) = {
            let mut view = self.view.write().await;
            let events = view.apply_remote(remote);
            (events, view.polling_required())
        };

        for event in events {
            let _ = self.events.send(event);
        }

        if still_required {
            TickOutcome::Continue
        } else {
            TickOutcome::Finished
        }
    }
}

/// Controls for a spawned poller.
///
/// Dropping the handle aborts the task, so an orchestrator being torn
/// down cannot leak a polling loop.
pub struct PollerHandle {
    running: Arc<RwLock<bool>>,
    handle: JoinHandle<()>,
}

impl PollerHandle {
    /// Ask the loop to exit before its next poll.
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Tear the task down without waiting for the next tick.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Stop the loop and abort whatever poll is in flight.
    pub async fn shutdown(self) {
        self.stop().await;
        self.handle.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
