//! Auto-rotation controller
//!
//! A background task that advances the current dashboard on a timer while
//! rotation is enabled and there is more than one dashboard to rotate through.
//! Hovering does not stop the timer; ticks that fire while paused are skipped.

use anyhow::{anyhow, Result};
use log::{debug, error, info, trace};
use multidash_types::AutoRotateConfig;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::store::SharedStore;

/// Rotation settings and dashboard count, read under one lock
fn snapshot(store: &SharedStore) -> Result<(AutoRotateConfig, usize)> {
    let guard = store.read().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
    Ok((guard.auto_rotate(), guard.dashboards().len()))
}

pub struct AutoRotateController {
    store: SharedStore,
    paused: watch::Sender<bool>,
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl AutoRotateController {
    /// Spawn the rotation task on the current tokio runtime
    pub fn spawn(store: SharedStore) -> Result<Self> {
        let revisions = store
            .read()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?
            .subscribe();
        let (paused, paused_rx) = watch::channel(false);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task_store = store.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = run(task_store, revisions, paused_rx, shutdown_rx).await {
                error!("Auto-rotation stopped: {}", e);
            }
        });

        Ok(Self {
            store,
            paused,
            shutdown,
            handle: Some(handle),
        })
    }

    /// Pointer entered the dashboard area; pauses when `pauseOnHover` is set
    pub fn pointer_enter(&self) {
        let pause_on_hover = snapshot(&self.store)
            .map(|(settings, _)| settings.pause_on_hover)
            .unwrap_or(false);
        if pause_on_hover {
            self.paused.send_replace(true);
        }
    }

    pub fn pointer_leave(&self) {
        self.paused.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(mut self) {
        self.shutdown.send_replace(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for AutoRotateController {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

async fn run(
    store: SharedStore,
    mut revisions: watch::Receiver<u64>,
    paused: watch::Receiver<bool>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut deadline: Option<Instant> = None;

    loop {
        let (settings, count) = snapshot(&store)?;
        let active = settings.enabled && count > 1;

        if !active {
            if deadline.take().is_some() {
                debug!("Auto-rotation idle (enabled: {}, dashboards: {})", settings.enabled, count);
            }
        } else if deadline.is_none() {
            let interval = Duration::from_secs(settings.interval.max(1));
            trace!("Next rotation in {:?}", interval);
            deadline = Some(Instant::now() + interval);
        }

        let armed = deadline;
        let timer = async move {
            match armed {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = timer => {
                deadline = None;
                if *paused.borrow() {
                    debug!("Rotation tick skipped while hovered");
                    continue;
                }
                let mut guard = store.write().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
                guard.next_dashboard();
                info!("Auto-rotated to {:?}", guard.current_dashboard_id());
            }
            changed = revisions.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = shutdown.changed() => {
                debug!("Auto-rotation shut down");
                return Ok(());
            }
        }
    }
}
