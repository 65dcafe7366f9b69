//! Per-call request context: who is calling, with which token, under which
//! trace, and until when.

use std::fmt;

use kubegate_core::Identity;
use tokio::sync::watch;
use tokio::time::Instant;

/// W3C trace correlation ids of the inbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
}

impl TraceContext {
    /// Parse a `traceparent` header (`00-<32 hex>-<16 hex>-<2 hex>`).
    ///
    /// All-zero ids are invalid per W3C and yield `None`.
    pub fn from_traceparent(header: &str) -> Option<Self> {
        let mut parts = header.trim().split('-');
        let (version, trace_id, span_id, flags) =
            (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || version.len() != 2 || flags.len() != 2 {
            return None;
        }
        let is_hex = |s: &str, len: usize| {
            s.len() == len && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        };
        if !is_hex(trace_id, 32) || !is_hex(span_id, 16) {
            return None;
        }
        if trace_id.bytes().all(|b| b == b'0') || span_id.bytes().all(|b| b == b'0') {
            return None;
        }
        Some(Self {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
        })
    }

    pub fn to_traceparent(&self) -> String {
        format!("00-{}-{}-01", self.trace_id, self.span_id)
    }
}

/// Cancels every [`RequestContext`] derived from it.
#[derive(Debug)]
pub struct Canceller(watch::Sender<bool>);

impl Canceller {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

/// Everything the gates need to know about one inbound call.
///
/// Cheap to clone. A context is done when its own canceller fires, when the
/// server it came from shuts down, or when its deadline passes.
#[derive(Clone, Default)]
pub struct RequestContext {
    identity: Option<Identity>,
    access_token: Option<String>,
    trace: Option<TraceContext>,
    call_cancel: Option<watch::Receiver<bool>>,
    server_cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_trace(mut self, trace: TraceContext) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: std::time::Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Attach a fresh caller-side cancellation signal.
    pub fn with_cancellation(mut self) -> (Self, Canceller) {
        let (tx, rx) = watch::channel(false);
        self.call_cancel = Some(rx);
        (self, Canceller(tx))
    }

    pub(crate) fn with_server_signal(mut self, rx: watch::Receiver<bool>) -> Self {
        self.server_cancel = Some(rx);
        self
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Bearer token of the caller, if the transport supplied one.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn trace(&self) -> Option<&TraceContext> {
        self.trace.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        let fired = |rx: &Option<watch::Receiver<bool>>| rx.as_ref().is_some_and(|rx| *rx.borrow());
        fired(&self.call_cancel)
            || fired(&self.server_cancel)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the context is cancelled or its deadline passes.
    /// Never resolves for a context with neither.
    pub async fn done(&self) {
        let deadline = self.deadline;
        let until_deadline = async move {
            match deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = fired(self.call_cancel.clone()) => {}
            _ = fired(self.server_cancel.clone()) => {}
            _ = until_deadline => {}
        }
    }
}

async fn fired(rx: Option<watch::Receiver<bool>>) {
    if let Some(mut rx) = rx {
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if !closed {
            return;
        }
    }
    // No signal, or the sender is gone without firing: never done.
    std::future::pending::<()>().await
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("identity", &self.identity)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("trace", &self.trace)
            .field("deadline", &self.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parses_valid_traceparent() {
        let tc = TraceContext::from_traceparent(
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        )
        .unwrap();
        assert_eq!(tc.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(tc.span_id, "00f067aa0ba902b7");
        assert_eq!(
            tc.to_traceparent(),
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
        );
    }

    #[test]
    fn rejects_malformed_traceparent() {
        for header in [
            "",
            "00-abc-def-01",
            "00-4BF92F3577B34DA6A3CE929D0E0E4736-00f067aa0ba902b7-01",
            "00-00000000000000000000000000000000-00f067aa0ba902b7-01",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01-extra",
        ] {
            assert!(TraceContext::from_traceparent(header).is_none(), "{header}");
        }
    }

    #[test]
    fn debug_never_prints_token() {
        let ctx = RequestContext::new().with_access_token("sk-live-123");
        let shown = format!("{:?}", ctx);
        assert!(!shown.contains("sk-live-123"));
        assert!(shown.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn canceller_completes_done() {
        let (ctx, canceller) = RequestContext::new().with_cancellation();
        assert!(!ctx.is_cancelled());

        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.done().await })
        };
        canceller.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_completes_done() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        ctx.done().await;
        assert!(ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn plain_context_is_never_done() {
        let ctx = RequestContext::new();
        let res = tokio::time::timeout(Duration::from_secs(5), ctx.done()).await;
        assert!(res.is_err());
        assert!(!ctx.is_cancelled());
    }
}
