//! Cooperative shutdown signal shared by the session tasks.
//!
//! Tasks observe the signal at their suspension points. Dropping the trigger
//! without firing it counts as a shutdown request, so no task can outlive the
//! owner of the trigger.

use tokio::sync::watch;

pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait(&mut self) {
        // Err means the trigger was dropped
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}
