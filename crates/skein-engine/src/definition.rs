use std::path::Path;

use serde::{Deserialize, Serialize};

use skein_core::config::{expand_env_vars, EngineConfig};
use skein_core::error::{Result, SkeinError};
use skein_core::traits::{Condition, JoinStrategy, MergeStrategy};
use skein_core::types::{Arrival, Payload, Results};

use crate::builtin::BuiltinBackend;
use crate::condition::{Always, Compare, CompareOp, KeyPresent};
use crate::join::{AllJoin, CountJoin};
use crate::merge::{IdentityMerge, ListMerge, ReduceMerge};
use crate::node::{InputMode, NodeSpec};
use crate::workflow::Workflow;

/// A workflow described in TOML.
///
/// ```toml
/// [[nodes]]
/// name = "double"
/// backends = [{ type = "multiply", factor = 2 }]
///
/// [[nodes]]
/// name = "inc"
/// backends = [{ type = "add", value = 1 }]
///
/// [[transitions]]
/// source = "double"
/// target = "inc"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub name: Option<String>,
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub transitions: Vec<TransitionDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub name: String,
    #[serde(default)]
    pub mode: InputMode,
    pub backends: Vec<BuiltinBackend>,
    #[serde(default)]
    pub join: Option<JoinSpec>,
    #[serde(default)]
    pub merge: Option<MergeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionDefinition {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub condition: ConditionSpec,
}

/// Transition guard as written in a definition file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionSpec {
    #[default]
    Always,
    Present {
        node: String,
    },
    Compare {
        node: String,
        op: CompareOp,
        value: Payload,
    },
}

impl Condition for ConditionSpec {
    fn evaluate(&self, results: &Results) -> Result<bool> {
        match self {
            ConditionSpec::Always => Always.evaluate(results),
            ConditionSpec::Present { node } => KeyPresent::new(node.as_str()).evaluate(results),
            ConditionSpec::Compare { node, op, value } => {
                Compare::new(node.as_str(), *op, value.clone()).evaluate(results)
            }
        }
    }
}

/// Join strategy as written in a definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JoinSpec {
    Count { n: usize },
    All { sources: Vec<String> },
}

impl JoinSpec {
    fn build(&self) -> JoinPolicy {
        match self {
            JoinSpec::Count { n } => JoinPolicy::Count(CountJoin::new(*n)),
            JoinSpec::All { sources } => JoinPolicy::All(AllJoin::new(sources.iter().cloned())),
        }
    }
}

enum JoinPolicy {
    Count(CountJoin),
    All(AllJoin),
}

impl JoinStrategy for JoinPolicy {
    fn is_satisfied(&self, buffer: &[Arrival]) -> Result<bool> {
        match self {
            JoinPolicy::Count(join) => join.is_satisfied(buffer),
            JoinPolicy::All(join) => join.is_satisfied(buffer),
        }
    }
}

/// Merge strategy as written in a definition file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MergeSpec {
    /// Exactly one input, passed through.
    Identity,
    /// All inputs as an array.
    List,
    /// Numeric sum of the inputs.
    Sum,
    /// Concatenation of array inputs; non-array inputs are appended as
    /// single elements.
    Concat,
}

impl MergeStrategy for MergeSpec {
    fn merge(&self, buffer: Vec<Arrival>) -> Result<Payload> {
        match self {
            MergeSpec::Identity => IdentityMerge.merge(buffer),
            MergeSpec::List => ListMerge.merge(buffer),
            MergeSpec::Sum => ReduceMerge::new(add_numbers)
                .with_seed(Payload::from(0))
                .merge(buffer),
            MergeSpec::Concat => ReduceMerge::new(concat_arrays)
                .with_seed(Payload::Array(Vec::new()))
                .merge(buffer),
        }
    }
}

fn add_numbers(acc: Payload, item: Payload) -> Result<Payload> {
    match (&acc, &item) {
        (Payload::Number(a), Payload::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) if x.checked_add(y).is_some() => Ok(Payload::from(x + y)),
            // Float sum on overflow or mixed operands.
            _ => Ok(Payload::from(
                a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default(),
            )),
        },
        _ => Err(SkeinError::Merge(format!(
            "sum merge expects numbers, got {} and {}",
            acc, item
        ))),
    }
}

fn concat_arrays(acc: Payload, item: Payload) -> Result<Payload> {
    let mut items = match acc {
        Payload::Array(items) => items,
        other => vec![other],
    };
    match item {
        Payload::Array(more) => items.extend(more),
        other => items.push(other),
    }
    Ok(Payload::Array(items))
}

impl WorkflowDefinition {
    /// Load a definition from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(&expand_env_vars(content))
            .map_err(|e| SkeinError::GraphDefinition(format!("invalid workflow definition: {}", e)))
    }

    /// Build the graph through `add_state` / `add_transition`, so the same
    /// validation applies as for graphs built in code.
    pub fn build(&self, config: EngineConfig) -> Result<Workflow> {
        let mut workflow = Workflow::with_config(config)?;

        for def in &self.nodes {
            let mut spec = NodeSpec::named(def.name.as_str()).with_mode(def.mode);
            for backend in &def.backends {
                spec = spec.with_backend(backend.clone());
            }
            if let Some(join) = &def.join {
                spec = spec.with_join(join.build());
            }
            if let Some(merge) = def.merge {
                spec = spec.with_merge(merge);
            }
            workflow.add_state(spec)?;
        }

        for def in &self.transitions {
            workflow.add_transition(
                def.source.as_str(),
                def.target.as_str(),
                def.condition.clone(),
            )?;
        }

        Ok(workflow)
    }
}
