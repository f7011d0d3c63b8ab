use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use skein_core::config::EngineConfig;
use skein_core::error::{Result, SkeinError};
use skein_core::traits::Condition;

use crate::node::{Node, NodeSpec};

/// A guarded edge between two registered nodes.
#[derive(Clone)]
pub struct Transition {
    pub source: String,
    pub target: String,
    pub condition: Arc<dyn Condition>,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// A graph of nodes and guarded transitions, plus the settings its runs use.
///
/// Build it with [`Workflow::add_state`] and [`Workflow::add_transition`],
/// then execute it with `run` or `run_parallel`. The graph is read-only
/// during a run; each run owns its own state.
#[derive(Debug, Default)]
pub struct Workflow {
    pub(crate) nodes: HashMap<String, Arc<Node>>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) config: EngineConfig,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a workflow that runs with the given engine settings.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a node.
    ///
    /// Names must be non-empty and unique: registering a name twice fails
    /// and keeps the first registration.
    pub fn add_state(&mut self, spec: NodeSpec) -> Result<()> {
        if self.nodes.contains_key(spec.name()) {
            return Err(SkeinError::GraphDefinition(format!(
                "node '{}' is already registered",
                spec.name()
            )));
        }
        let node = Node::from_spec(spec)?;
        debug!(node = %node.name(), mode = %node.mode(), "Registered node");
        self.nodes.insert(node.name().to_string(), Arc::new(node));
        Ok(())
    }

    /// Register a transition. Both endpoints must already be registered.
    pub fn add_transition(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        condition: impl Condition,
    ) -> Result<()> {
        let source = source.into();
        let target = target.into();
        for endpoint in [&source, &target] {
            if !self.nodes.contains_key(endpoint) {
                return Err(SkeinError::GraphDefinition(format!(
                    "transition {} -> {} references unknown node '{}'",
                    source, target, endpoint
                )));
            }
        }
        debug!(%source, %target, "Registered transition");
        self.transitions.push(Transition {
            source,
            target,
            condition: Arc::new(condition),
        });
        Ok(())
    }

    /// Get a registered node by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name).map(|n| n.as_ref())
    }

    /// Names of all registered nodes, sorted.
    pub fn node_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nodes.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Transitions in registration order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Transitions leaving `source`, in registration order.
    pub fn outgoing<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a Transition> + 'a {
        self.transitions.iter().filter(move |t| t.source == source)
    }
}
