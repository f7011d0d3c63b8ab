use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use skein_core::error::{Result, SkeinError};
use skein_core::traits::{Backend, JoinStrategy, MergeStrategy};
use skein_core::types::Payload;

use crate::join::CountJoin;
use crate::merge::IdentityMerge;

/// How a node feeds its payload to its backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Invoke once with the payload as-is.
    #[default]
    PassThrough,
    /// Invoke once with the whole array payload.
    Batch,
    /// Invoke once per element of the array payload, each as its own work
    /// unit scheduled by the workflow.
    Split,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputMode::PassThrough => "pass_through",
            InputMode::Batch => "batch",
            InputMode::Split => "split",
        };
        f.write_str(name)
    }
}

/// What a single node invocation yielded.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    /// The node's output, `null` included.
    Produced(Payload),
    /// A split node handed its elements back for scheduling; its outputs
    /// arrive later, one per element.
    Deferred { items: Vec<Payload> },
}

/// Whether a work unit is a regular dispatch or one element of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Entry,
    Element,
}

/// A (node, payload) pair awaiting execution.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkUnit {
    pub node: String,
    pub payload: Payload,
    pub kind: UnitKind,
}

impl WorkUnit {
    pub fn entry(node: impl Into<String>, payload: Payload) -> Self {
        Self {
            node: node.into(),
            payload,
            kind: UnitKind::Entry,
        }
    }

    pub fn element(node: impl Into<String>, payload: Payload) -> Self {
        Self {
            node: node.into(),
            payload,
            kind: UnitKind::Element,
        }
    }
}

/// Builder for a node registered with `Workflow::add_state`.
pub struct NodeSpec {
    name: String,
    backends: Vec<Arc<dyn Backend>>,
    mode: InputMode,
    join: Option<Arc<dyn JoinStrategy>>,
    merge: Option<Arc<dyn MergeStrategy>>,
}

impl NodeSpec {
    /// A pass-through node with a single backend and default join/merge.
    pub fn new(name: impl Into<String>, backend: impl Backend) -> Self {
        Self::named(name).with_backend(backend)
    }

    /// A node with no backends yet. At least one must be added before
    /// registration.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backends: Vec::new(),
            mode: InputMode::default(),
            join: None,
            merge: None,
        }
    }

    /// Append a backend. Backends run as a pipeline, each receiving the
    /// previous one's output.
    pub fn with_backend(mut self, backend: impl Backend) -> Self {
        self.backends.push(Arc::new(backend));
        self
    }

    pub fn with_mode(mut self, mode: InputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_join(mut self, join: impl JoinStrategy) -> Self {
        self.join = Some(Arc::new(join));
        self
    }

    pub fn with_merge(mut self, merge: impl MergeStrategy) -> Self {
        self.merge = Some(Arc::new(merge));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A registered processing step. Immutable once added to a workflow.
pub struct Node {
    name: String,
    backends: Vec<Arc<dyn Backend>>,
    mode: InputMode,
    join: Arc<dyn JoinStrategy>,
    merge: Arc<dyn MergeStrategy>,
}

impl Node {
    pub(crate) fn from_spec(spec: NodeSpec) -> Result<Self> {
        if spec.name.trim().is_empty() {
            return Err(SkeinError::GraphDefinition(
                "node name must not be empty".into(),
            ));
        }
        if spec.backends.is_empty() {
            return Err(SkeinError::GraphDefinition(format!(
                "node '{}' has no backends",
                spec.name
            )));
        }
        Ok(Self {
            name: spec.name,
            backends: spec.backends,
            mode: spec.mode,
            join: spec
                .join
                .unwrap_or_else(|| Arc::new(CountJoin::default()) as Arc<dyn JoinStrategy>),
            merge: spec
                .merge
                .unwrap_or_else(|| Arc::new(IdentityMerge) as Arc<dyn MergeStrategy>),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn join(&self) -> &dyn JoinStrategy {
        self.join.as_ref()
    }

    pub fn merge(&self) -> &dyn MergeStrategy {
        self.merge.as_ref()
    }

    /// Execute one work unit for this node.
    ///
    /// Split elements always run through the pipeline directly; entry units
    /// follow the node's input mode. Batch and split reject non-array
    /// payloads before any backend is called.
    pub async fn run(&self, payload: Payload, kind: UnitKind) -> Result<NodeOutcome> {
        if kind == UnitKind::Element {
            return self.invoke(payload).await.map(NodeOutcome::Produced);
        }

        match self.mode {
            InputMode::PassThrough => self.invoke(payload).await.map(NodeOutcome::Produced),
            InputMode::Batch => {
                if !payload.is_array() {
                    return Err(self.shape_error());
                }
                self.invoke(payload).await.map(NodeOutcome::Produced)
            }
            InputMode::Split => match payload {
                Payload::Array(items) => {
                    debug!(node = %self.name, items = items.len(), "Splitting payload");
                    Ok(NodeOutcome::Deferred { items })
                }
                _ => Err(self.shape_error()),
            },
        }
    }

    async fn invoke(&self, payload: Payload) -> Result<Payload> {
        let mut current = payload;
        for backend in &self.backends {
            debug!(node = %self.name, backend = backend.name(), "Invoking backend");
            current = backend.invoke(current).await?;
        }
        Ok(current)
    }

    fn shape_error(&self) -> SkeinError {
        SkeinError::InputShape {
            node: self.name.clone(),
            mode: self.mode.to_string(),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field(
                "backends",
                &self.backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
