//! Dev-server socket hub and the scheduled tasks tied to its lifetime.
//!
//! [`DevServer`] stands in for the host's socket channel: plugins register inbound
//! handlers with [`DevServer::on`] and push outbound messages with
//! [`DevServer::send`]. Outbound messages fan out over a tokio broadcast channel to
//! every connected client (see [`transport`]).
//!
//! [`DevIntegration`] is the handle a plugin returns from its server hook. It owns the
//! plugin's free-running timers and watchers and must be stopped when the server goes
//! away; dropping it stops it as well.

pub mod transport;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Capacity of the outbound broadcast channel
const OUTBOUND_CAPACITY: usize = 256;

/// Wire envelope for every socket message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketMessage {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

/// Inbound event handler
pub type Handler = Arc<dyn Fn(Value) + Send + Sync>;

struct Hub {
    handlers: RwLock<HashMap<String, Vec<Handler>>>,
    outbound: broadcast::Sender<SocketMessage>,
}

/// Cloneable handle to the dev-server socket channel.
#[derive(Clone)]
pub struct DevServer {
    hub: Arc<Hub>,
}

impl DevServer {
    pub fn new() -> Self {
        let (outbound, _) = broadcast::channel(OUTBOUND_CAPACITY);
        Self {
            hub: Arc::new(Hub {
                handlers: RwLock::new(HashMap::new()),
                outbound,
            }),
        }
    }

    /// Register a handler for an inbound event.
    pub fn on<F>(&self, event: &str, handler: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.hub
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_string())
            .or_default()
            .push(Arc::new(handler));
        tracing::debug!("Registered socket handler for {}", event);
    }

    /// Broadcast an outbound event to every subscriber.
    ///
    /// Returns the number of receivers reached; zero listeners is not an error.
    pub fn send<T: Serialize>(&self, event: &str, payload: &T) -> usize {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize payload for {}: {}", event, e);
                return 0;
            }
        };

        self.hub
            .outbound
            .send(SocketMessage {
                event: event.to_string(),
                payload,
            })
            .unwrap_or(0)
    }

    /// Deliver an inbound event to its handlers; returns how many ran.
    pub fn dispatch(&self, event: &str, payload: Value) -> usize {
        // Clone the handler list so handlers may register or send without deadlocking
        let handlers: Vec<Handler> = self
            .hub
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            tracing::debug!("No socket handler for {}", event);
        }
        for handler in &handlers {
            handler(payload.clone());
        }
        handlers.len()
    }

    /// Subscribe to outbound messages
    pub fn subscribe(&self) -> broadcast::Receiver<SocketMessage> {
        self.hub.outbound.subscribe()
    }

    /// Whether any handler listens for `event`
    pub fn has_handler(&self, event: &str) -> bool {
        self.hub
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .is_some_and(|h| !h.is_empty())
    }
}

impl Default for DevServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `tick` every `period` until the returned task is aborted.
///
/// The first call happens one full period after spawning.
pub fn spawn_interval<F>(period: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            tick();
        }
    })
}

/// Run synchronous file-system work from a socket handler.
///
/// Inside a tokio runtime the work goes to the blocking pool so connection tasks keep
/// moving; without one it runs inline.
pub fn run_blocking<F>(work: F)
where
    F: FnOnce() + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(work);
        }
        Err(_) => work(),
    }
}

/// Resources a plugin keeps alive while the dev server runs.
pub struct DevIntegration {
    name: String,
    tasks: Vec<JoinHandle<()>>,
    watcher: Option<notify::RecommendedWatcher>,
}

impl DevIntegration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            watcher: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_task(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    /// Spawn a future owned by this integration
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(future));
    }

    pub fn set_watcher(&mut self, watcher: notify::RecommendedWatcher) {
        self.watcher = Some(watcher);
    }

    /// Whether any owned task is still running
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    /// Abort every task and release the watcher. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.tasks.is_empty() && self.watcher.is_none() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.watcher = None;
        tracing::info!("Stopped dev integration: {}", self.name);
    }
}

impl Drop for DevIntegration {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Every plugin's integration for one dev-server instance.
#[derive(Default)]
pub struct DevSession {
    integrations: Vec<DevIntegration>,
}

impl DevSession {
    pub fn push(&mut self, integration: DevIntegration) {
        self.integrations.push(integration);
    }

    pub fn names(&self) -> Vec<&str> {
        self.integrations.iter().map(DevIntegration::name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.integrations.is_empty()
    }

    /// Stop every integration, in registration order
    pub fn stop(&mut self) {
        for integration in &mut self.integrations {
            integration.stop();
        }
        self.integrations.clear();
    }
}
