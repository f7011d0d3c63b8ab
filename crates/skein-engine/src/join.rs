use std::collections::BTreeSet;

use skein_core::error::Result;
use skein_core::traits::JoinStrategy;
use skein_core::types::Arrival;

/// Satisfied once at least `n` inputs are buffered.
///
/// Monotone: a buffer that satisfies it keeps satisfying it as more
/// inputs are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountJoin {
    n: usize,
}

impl CountJoin {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    pub fn required(&self) -> usize {
        self.n
    }
}

/// The default join: run as soon as one input arrives.
impl Default for CountJoin {
    fn default() -> Self {
        Self::new(1)
    }
}

impl JoinStrategy for CountJoin {
    fn is_satisfied(&self, buffer: &[Arrival]) -> Result<bool> {
        Ok(buffer.len() >= self.n)
    }
}

/// Satisfied once every expected predecessor has contributed at least one
/// input. Extra inputs from a source that arrives twice stay in the buffer
/// and are merged along with the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllJoin {
    expected: BTreeSet<String>,
}

impl AllJoin {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expected: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// Expected sources that have not contributed yet.
    pub fn missing<'a>(&'a self, buffer: &[Arrival]) -> Vec<&'a str> {
        self.expected
            .iter()
            .filter(|s| !buffer.iter().any(|a| &a.source == *s))
            .map(|s| s.as_str())
            .collect()
    }
}

impl JoinStrategy for AllJoin {
    fn is_satisfied(&self, buffer: &[Arrival]) -> Result<bool> {
        Ok(self.missing(buffer).is_empty())
    }
}

/// Use a closure as a join strategy.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&[Arrival]) -> Result<bool> + Send + Sync + 'static,
{
    f
}
