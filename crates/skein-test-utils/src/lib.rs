//! Shared test utilities for Skein crates.
//!
//! [`Probe`] wraps a payload function in a [`Backend`] that counts calls,
//! records inputs, and tracks how many invocations overlap in time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::json;

use skein_core::error::{Result, SkeinError};
use skein_core::traits::Backend;
use skein_core::types::Payload;

#[derive(Default)]
struct ProbeState {
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    inputs: Mutex<Vec<Payload>>,
}

/// Shared observation handle for one or more [`ProbeBackend`]s.
#[derive(Clone, Default)]
pub struct Probe {
    state: Arc<ProbeState>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `f` in a backend that reports to this probe.
    pub fn backend<F>(&self, name: impl Into<String>, f: F) -> ProbeBackend<F>
    where
        F: Fn(Payload) -> Result<Payload> + Send + Sync + 'static,
    {
        ProbeBackend {
            name: name.into(),
            probe: self.clone(),
            delay: None,
            f,
        }
    }

    /// Number of completed or in-progress invocations.
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Payloads received, in invocation order.
    pub fn inputs(&self) -> Vec<Payload> {
        self.state
            .inputs
            .lock()
            .map(|inputs| inputs.clone())
            .unwrap_or_default()
    }

    /// Highest number of invocations observed running at once.
    pub fn peak(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    fn enter(&self, payload: &Payload) {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut inputs) = self.state.inputs.lock() {
            inputs.push(payload.clone());
        }
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(active, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.state.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Backend produced by [`Probe::backend`].
pub struct ProbeBackend<F> {
    name: String,
    probe: Probe,
    delay: Option<Duration>,
    f: F,
}

impl<F> ProbeBackend<F> {
    /// Sleep for `millis` before computing the output.
    pub fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Some(Duration::from_millis(millis));
        self
    }
}

impl<F> Backend for ProbeBackend<F>
where
    F: Fn(Payload) -> Result<Payload> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, payload: Payload) -> BoxFuture<'_, Result<Payload>> {
        Box::pin(async move {
            self.probe.enter(&payload);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let output = (self.f)(payload);
            self.probe.exit();
            output
        })
    }
}

pub fn double(payload: Payload) -> Result<Payload> {
    number(&payload).map(|n| json!(n * 2))
}

pub fn increment(payload: Payload) -> Result<Payload> {
    number(&payload).map(|n| json!(n + 1))
}

pub fn identity(payload: Payload) -> Result<Payload> {
    Ok(payload)
}

/// A payload function that always fails with `message`.
pub fn failing(message: &'static str) -> impl Fn(Payload) -> Result<Payload> + Send + Sync + 'static {
    move |_| Err(SkeinError::backend("failing", message))
}

fn number(payload: &Payload) -> Result<i64> {
    payload
        .as_i64()
        .ok_or_else(|| SkeinError::backend("probe", format!("expected an integer, got {}", payload)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_records_calls() {
        let probe = Probe::new();
        let backend = probe.backend("double", double);
        assert_eq!(backend.invoke(json!(4)).await.unwrap(), json!(8));
        assert_eq!(backend.invoke(json!(1)).await.unwrap(), json!(2));
        assert_eq!(probe.calls(), 2);
        assert_eq!(probe.inputs(), vec![json!(4), json!(1)]);
        assert_eq!(probe.peak(), 1);
    }

    #[tokio::test]
    async fn test_failing_backend() {
        let probe = Probe::new();
        let backend = probe.backend("bad", failing("boom"));
        let err = backend.invoke(json!(null)).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(probe.calls(), 1);
    }
}
