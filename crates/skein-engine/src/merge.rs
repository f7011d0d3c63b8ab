use skein_core::error::{Result, SkeinError};
use skein_core::traits::MergeStrategy;
use skein_core::types::{Arrival, Payload};

/// Passes a single input through unchanged. The default merge.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMerge;

impl MergeStrategy for IdentityMerge {
    fn merge(&self, mut buffer: Vec<Arrival>) -> Result<Payload> {
        match buffer.len() {
            1 => Ok(buffer.remove(0).payload),
            n => Err(SkeinError::Merge(format!(
                "identity merge expects exactly one input, got {}",
                n
            ))),
        }
    }
}

/// Collects every input into a JSON array, in arrival order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListMerge;

impl MergeStrategy for ListMerge {
    fn merge(&self, buffer: Vec<Arrival>) -> Result<Payload> {
        Ok(Payload::Array(
            buffer.into_iter().map(|a| a.payload).collect(),
        ))
    }
}

/// Left fold over the inputs in arrival order.
///
/// Without a seed the first input is the initial accumulator, so an empty
/// buffer cannot be merged.
pub struct ReduceMerge<F> {
    combine: F,
    seed: Option<Payload>,
}

impl<F> ReduceMerge<F>
where
    F: Fn(Payload, Payload) -> Result<Payload> + Send + Sync + 'static,
{
    pub fn new(combine: F) -> Self {
        Self {
            combine,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Payload) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl<F> MergeStrategy for ReduceMerge<F>
where
    F: Fn(Payload, Payload) -> Result<Payload> + Send + Sync + 'static,
{
    fn merge(&self, buffer: Vec<Arrival>) -> Result<Payload> {
        let mut items = buffer.into_iter().map(|a| a.payload);
        let init = match &self.seed {
            Some(seed) => seed.clone(),
            None => items.next().ok_or_else(|| {
                SkeinError::Merge("reduce merge without a seed needs at least one input".into())
            })?,
        };
        items.try_fold(init, |acc, item| (self.combine)(acc, item))
    }
}

/// Use a closure as a merge strategy.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(Vec<Arrival>) -> Result<Payload> + Send + Sync + 'static,
{
    f
}
