//! Registry of long-lived port-forward sessions, torn down at shutdown.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),
}

/// Handle to a running port forward. The forwarder owns the receiving end
/// of `stop` and exits when a signal arrives or the sender is dropped.
#[derive(Debug, Clone)]
pub struct PortForwardSession {
    pub namespace: String,
    pub pod_name: String,
    pub local_port: u16,
    pub remote_port: u16,
    stop: mpsc::Sender<()>,
}

impl PortForwardSession {
    pub fn new(
        namespace: impl Into<String>,
        pod_name: impl Into<String>,
        local_port: u16,
        remote_port: u16,
    ) -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        let session = Self {
            namespace: namespace.into(),
            pod_name: pod_name.into(),
            local_port,
            remote_port,
            stop: tx,
        };
        (session, rx)
    }

    /// Send the stop signal without waiting. A full or closed channel means the
    /// forwarder is already stopping.
    fn signal_stop(&self) {
        let _ = self.stop.try_send(());
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, PortForwardSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation is a single map operation, so a poisoned map is still
    // consistent and stays usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, PortForwardSession>> {
        self.sessions.read().unwrap_or_else(|poisoned| {
            tracing::error!("session registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, PortForwardSession>> {
        self.sessions.write().unwrap_or_else(|poisoned| {
            tracing::error!("session registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn register(&self, id: impl Into<String>, session: PortForwardSession) {
        let id = id.into();
        tracing::debug!(session_id = %id, "registered port forward session");
        self.write().insert(id, session);
    }

    pub fn unregister(&self, id: &str) {
        if self.write().remove(id).is_some() {
            tracing::debug!(session_id = %id, "unregistered port forward session");
        }
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Sorted snapshot of the registered ids.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn get(&self, id: &str) -> Option<PortForwardSession> {
        self.read().get(id).cloned()
    }

    pub fn stop(&self, id: &str) -> Result<(), SessionError> {
        let removed = self.write().remove(id);
        match removed {
            Some(session) => {
                session.signal_stop();
                tracing::info!(session_id = %id, "port forward session stopped");
                Ok(())
            }
            None => Err(SessionError::NotFound(id.to_string())),
        }
    }

    /// Stop and forget every session. Returns how many were stopped.
    pub fn stop_all(&self) -> usize {
        let drained: Vec<(String, PortForwardSession)> = self.write().drain().collect();
        if drained.is_empty() {
            return 0;
        }
        for (id, session) in &drained {
            tracing::debug!(session_id = %id, "stopping port forward session");
            session.signal_stop();
        }
        tracing::info!(count = drained.len(), "all port forward sessions stopped");
        drained.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn stop_signals_and_removes() {
        let reg = SessionRegistry::new();
        let (session, mut rx) = PortForwardSession::new("web", "frontend-0", 8080, 80);
        reg.register("pf-1", session);
        assert_eq!(reg.count(), 1);
        assert_eq!(reg.get("pf-1").unwrap().remote_port, 80);

        reg.stop("pf-1").unwrap();
        assert_eq!(reg.count(), 0);
        assert_eq!(rx.recv().await, Some(()));
    }

    #[test]
    fn stop_unknown_session_is_error() {
        let reg = SessionRegistry::new();
        let err = reg.stop("missing").unwrap_err();
        assert_eq!(err.to_string(), "session missing not found");
    }

    #[test]
    fn stop_does_not_block_when_forwarder_is_gone() {
        let reg = SessionRegistry::new();
        let (session, rx) = PortForwardSession::new("ns", "pod", 1, 2);
        drop(rx);
        reg.register("a", session);
        reg.stop("a").unwrap();
    }

    #[test]
    fn stop_all_returns_count_and_clears() {
        let reg = SessionRegistry::new();
        let mut receivers = Vec::new();
        for i in 0..3 {
            let (s, rx) = PortForwardSession::new("ns", format!("pod-{i}"), 9000 + i, 80);
            receivers.push(rx);
            reg.register(format!("pf-{i}"), s);
        }
        assert_eq!(reg.ids(), vec!["pf-0", "pf-1", "pf-2"]);
        assert_eq!(reg.stop_all(), 3);
        assert_eq!(reg.count(), 0);
        assert_eq!(reg.stop_all(), 0);
        for mut rx in receivers {
            assert_eq!(rx.try_recv(), Ok(()));
        }
    }

    #[test]
    fn registry_survives_a_panicked_holder() {
        let reg = Arc::new(SessionRegistry::new());
        let (s, _rx0) = PortForwardSession::new("ns", "pod-0", 1, 2);
        reg.register("before", s);

        let poisoner = reg.clone();
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.sessions.write().unwrap();
            panic!("holder died");
        })
        .join();
        assert!(joined.is_err());
        assert!(reg.sessions.is_poisoned());

        let (s, _rx1) = PortForwardSession::new("ns", "pod-1", 3, 4);
        reg.register("after", s);
        assert_eq!(reg.ids(), vec!["after", "before"]);
        assert_eq!(reg.stop_all(), 2);
    }

    #[test]
    fn concurrent_registration() {
        let reg = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let reg = reg.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let (s, _rx) = PortForwardSession::new("ns", "pod", 0, 0);
                        reg.register(format!("{t}-{i}"), s);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.count(), 200);
    }
}
