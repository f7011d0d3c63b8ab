use std::future::Future;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{Arrival, Payload, Results};

/// Execution backend: the opaque unit of work behind a node.
pub trait Backend: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        "backend"
    }

    /// Process one payload.
    fn invoke(&self, payload: Payload) -> BoxFuture<'_, Result<Payload>>;
}

/// Transition guard, evaluated against the results accumulated so far.
/// Implementations must not have side effects.
pub trait Condition: Send + Sync + 'static {
    fn evaluate(&self, results: &Results) -> Result<bool>;
}

/// Decides whether a node's buffered inputs are sufficient to run it.
pub trait JoinStrategy: Send + Sync + 'static {
    fn is_satisfied(&self, buffer: &[Arrival]) -> Result<bool>;
}

/// Combines a node's drained buffer into the payload it runs with.
pub trait MergeStrategy: Send + Sync + 'static {
    fn merge(&self, buffer: Vec<Arrival>) -> Result<Payload>;
}

impl<F> Condition for F
where
    F: Fn(&Results) -> Result<bool> + Send + Sync + 'static,
{
    fn evaluate(&self, results: &Results) -> Result<bool> {
        self(results)
    }
}

impl<F> JoinStrategy for F
where
    F: Fn(&[Arrival]) -> Result<bool> + Send + Sync + 'static,
{
    fn is_satisfied(&self, buffer: &[Arrival]) -> Result<bool> {
        self(buffer)
    }
}

impl<F> MergeStrategy for F
where
    F: Fn(Vec<Arrival>) -> Result<Payload> + Send + Sync + 'static,
{
    fn merge(&self, buffer: Vec<Arrival>) -> Result<Payload> {
        self(buffer)
    }
}

/// Backend wrapping a synchronous closure.
pub struct FnBackend<F> {
    name: String,
    f: F,
}

impl<F> FnBackend<F>
where
    F: Fn(Payload) -> Result<Payload> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Backend for FnBackend<F>
where
    F: Fn(Payload) -> Result<Payload> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, payload: Payload) -> BoxFuture<'_, Result<Payload>> {
        Box::pin(futures::future::ready((self.f)(payload)))
    }
}

/// Backend wrapping a closure that returns a future.
pub struct AsyncFnBackend<F> {
    name: String,
    f: F,
}

impl<F, Fut> AsyncFnBackend<F>
where
    F: Fn(Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F, Fut> Backend for AsyncFnBackend<F>
where
    F: Fn(Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, payload: Payload) -> BoxFuture<'_, Result<Payload>> {
        Box::pin((self.f)(payload))
    }
}

/// Adapt a synchronous closure into a [`Backend`].
pub fn from_fn<F>(name: impl Into<String>, f: F) -> FnBackend<F>
where
    F: Fn(Payload) -> Result<Payload> + Send + Sync + 'static,
{
    FnBackend::new(name, f)
}

/// Adapt an async closure into a [`Backend`].
pub fn from_async_fn<F, Fut>(name: impl Into<String>, f: F) -> AsyncFnBackend<F>
where
    F: Fn(Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    AsyncFnBackend::new(name, f)
}
