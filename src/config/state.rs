//! Process-wide mutable gateway state.
//!
//! # Responsibilities
//! - Hold the runtime directory, data-plane port and UI asset path
//! - Persist every change through an injected save hook
//! - Fan a committed port change out to every registered observer, in order
//!
//! # Design Decisions
//! - Constructed once and passed around as `Arc<State>`, never global
//! - A port change is committed before any observer runs; observer failures
//!   are reported to the caller but never roll the value back
//! - Port changes are serialized end to end (commit, save, observers), so
//!   the last committed port is also the last one observers acted on
//! - Field locks are never held across an observer `.await`; only the
//!   port-change lock is

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::RwLock;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by save hooks and observers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type PortObserver = Arc<dyn Fn(String) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

type SaveHook = Arc<dyn Fn(&StateSnapshot) -> Result<(), BoxError> + Send + Sync>;

/// Errors surfaced by state setters.
#[derive(Debug, Error)]
pub enum StateError {
    /// The save hook could not persist the new value.
    #[error("failed to persist state: {0}")]
    Save(#[source] BoxError),

    /// A port-change observer failed. The new port is still committed.
    #[error("{0}")]
    Observer(#[source] BoxError),
}

/// Point-in-time copy of every state field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    pub runtime_path: PathBuf,
    /// Empty until a port has been assigned.
    pub gateway_port: String,
    pub www_path: PathBuf,
}

/// Mutable gateway state with change notification.
pub struct State {
    fields: RwLock<StateSnapshot>,
    observers: RwLock<Vec<PortObserver>>,
    save_hook: RwLock<Option<SaveHook>>,
    port_change: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("fields", &*self.fields.read())
            .field("observers", &self.observers.read().len())
            .field("save_hook", &self.save_hook.read().is_some())
            .finish()
    }
}

impl State {
    /// Create the state from its initial values. Nothing is persisted.
    pub fn new(runtime_path: impl Into<PathBuf>, gateway_port: impl Into<String>, www_path: impl Into<PathBuf>) -> Self {
        Self {
            fields: RwLock::new(StateSnapshot {
                runtime_path: runtime_path.into(),
                gateway_port: gateway_port.into(),
                www_path: www_path.into(),
            }),
            observers: RwLock::new(Vec::new()),
            save_hook: RwLock::new(None),
            port_change: tokio::sync::Mutex::new(()),
        }
    }

    /// Install the hook called after every setter.
    pub fn with_save_hook<F>(self, hook: F) -> Self
    where
        F: Fn(&StateSnapshot) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        *self.save_hook.write() = Some(Arc::new(hook));
        self
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.fields.read().clone()
    }

    pub fn runtime_path(&self) -> PathBuf {
        self.fields.read().runtime_path.clone()
    }

    pub fn gateway_port(&self) -> String {
        self.fields.read().gateway_port.clone()
    }

    pub fn www_path(&self) -> PathBuf {
        self.fields.read().www_path.clone()
    }

    pub fn set_runtime_path(&self, path: &Path) -> Result<(), StateError> {
        let snapshot = {
            let mut fields = self.fields.write();
            fields.runtime_path = path.to_path_buf();
            fields.clone()
        };
        self.save(&snapshot)
    }

    pub fn set_www_path(&self, path: &Path) -> Result<(), StateError> {
        let snapshot = {
            let mut fields = self.fields.write();
            fields.www_path = path.to_path_buf();
            fields.clone()
        };
        self.save(&snapshot)
    }

    /// Commit a new port, persist it, then run every observer in
    /// registration order.
    ///
    /// All observers run even if an earlier one fails; the first error is
    /// returned.
    pub async fn set_gateway_port(&self, port: impl Into<String>) -> Result<(), StateError> {
        let port = port.into();
        let _serialized = self.port_change.lock().await;
        let snapshot = {
            let mut fields = self.fields.write();
            fields.gateway_port = port.clone();
            fields.clone()
        };

        let mut first_error = self.save(&snapshot).err();

        let observers = self.observers.read().clone();
        for (index, observer) in observers.iter().enumerate() {
            if let Err(e) = observer(port.clone()).await {
                tracing::warn!(port = %port, observer = index, error = %e, "Gateway port observer failed");
                first_error.get_or_insert(StateError::Observer(e));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Register an observer for committed port changes.
    ///
    /// Observers run under the port-change lock and must not set the port
    /// themselves.
    pub fn on_gateway_port_change<F, Fut>(&self, observer: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.observers
            .write()
            .push(Arc::new(move |port| observer(port).boxed()));
    }

    fn save(&self, snapshot: &StateSnapshot) -> Result<(), StateError> {
        let hook = self.save_hook.read().clone();
        match hook {
            Some(hook) => hook(snapshot).map_err(StateError::Save),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn state() -> State {
        State::new("/tmp/run", "", "/tmp/www")
    }

    #[tokio::test]
    async fn observers_run_in_registration_order() {
        let state = state();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for name in ["persist", "reload"] {
            let calls = calls.clone();
            state.on_gateway_port_change(move |port| {
                let calls = calls.clone();
                async move {
                    calls.lock().push(format!("{name}:{port}"));
                    Ok::<(), BoxError>(())
                }
            });
        }

        state.set_gateway_port("8080").await.unwrap();
        assert_eq!(*calls.lock(), vec!["persist:8080", "reload:8080"]);
    }

    #[tokio::test]
    async fn failing_observer_keeps_value_and_runs_the_rest() {
        let state = state();
        let reached = Arc::new(Mutex::new(false));

        state.on_gateway_port_change(|_| async { Err::<(), BoxError>("port busy".into()) });
        let flag = reached.clone();
        state.on_gateway_port_change(move |_| {
            let flag = flag.clone();
            async move {
                *flag.lock() = true;
                Ok::<(), BoxError>(())
            }
        });

        let err = state.set_gateway_port("81").await.unwrap_err();
        assert!(matches!(err, StateError::Observer(_)));
        assert_eq!(err.to_string(), "port busy");
        assert_eq!(state.gateway_port(), "81");
        assert!(*reached.lock());
    }

    #[tokio::test]
    async fn save_hook_sees_every_change() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let sink = saved.clone();
        let state = state().with_save_hook(move |snapshot| {
            sink.lock().push(snapshot.clone());
            Ok(())
        });

        state.set_www_path(Path::new("/srv/www")).unwrap();
        state.set_gateway_port("8081").await.unwrap();

        let saved = saved.lock();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].gateway_port, "8081");
        assert_eq!(saved[1].www_path, PathBuf::from("/srv/www"));
    }

    #[test]
    fn save_failure_is_surfaced() {
        let state = state().with_save_hook(|_| Err("read-only filesystem".into()));
        let err = state.set_runtime_path(Path::new("/run/homegate")).unwrap_err();
        assert!(matches!(err, StateError::Save(_)));
        assert_eq!(state.runtime_path(), PathBuf::from("/run/homegate"));
    }
}
