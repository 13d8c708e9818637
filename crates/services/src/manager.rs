use std::{collections::BTreeMap, sync::Arc};

use {tokio::sync::RwLock, tracing::info};

/// Stop capability of a worker. Requesting a stop only raises a flag; the
/// worker observes it at its next loop head.
pub trait Stop: Send + Sync {
    fn request_stop(&self);
}

/// A registered worker. Capabilities are optional so a handle can expose only
/// what it supports.
pub trait ServiceHandle: Send + Sync {
    fn stopper(&self) -> Option<&dyn Stop> {
        None
    }

    /// Whether the worker exposes a start entry point.
    fn can_start(&self) -> bool {
        false
    }
}

struct ServiceEntry {
    handle: Arc<dyn ServiceHandle>,
    paused: bool,
}

/// Snapshot of one registered service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub name: String,
    pub paused: bool,
}

/// Registry of named workers and their paused flag.
#[derive(Default)]
pub struct ServiceManager {
    services: RwLock<BTreeMap<String, ServiceEntry>>,
}

impl ServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a worker. New entries start not paused.
    pub async fn register(&self, name: impl Into<String>, handle: Arc<dyn ServiceHandle>) {
        let name = name.into();
        info!(service = %name, "service registered");
        self.services.write().await.insert(name, ServiceEntry {
            handle,
            paused: false,
        });
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn ServiceHandle>> {
        self.services
            .read()
            .await
            .get(name)
            .map(|e| Arc::clone(&e.handle))
    }

    /// Mark paused and request a stop when the handle supports it. Does not
    /// wait for the worker to exit. Returns whether `name` was known.
    pub async fn pause(&self, name: &str) -> bool {
        let mut services = self.services.write().await;
        let Some(entry) = services.get_mut(name) else {
            return false;
        };
        entry.paused = true;
        if let Some(stop) = entry.handle.stopper() {
            stop.request_stop();
        }
        info!(service = name, "service paused");
        true
    }

    /// Mark not paused. Returns `true` only when the handle can be started;
    /// restarting the worker loop is left to the caller.
    pub async fn resume(&self, name: &str) -> bool {
        let mut services = self.services.write().await;
        let Some(entry) = services.get_mut(name) else {
            return false;
        };
        entry.paused = false;
        info!(service = name, "service resumed");
        entry.handle.can_start()
    }

    pub async fn is_paused(&self, name: &str) -> Option<bool> {
        self.services.read().await.get(name).map(|e| e.paused)
    }

    pub async fn list_names(&self) -> Vec<String> {
        self.services.read().await.keys().cloned().collect()
    }

    pub async fn statuses(&self) -> Vec<ServiceStatus> {
        self.services
            .read()
            .await
            .iter()
            .map(|(name, e)| ServiceStatus {
                name: name.clone(),
                paused: e.paused,
            })
            .collect()
    }
}
