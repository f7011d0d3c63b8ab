//! Skein workflow engine: guarded graph execution with fan-out and fan-in.
//!
//! A workflow is a directed graph of [`Node`]s connected by [`Transition`]s.
//! Each node wraps one or more opaque backends and an [`InputMode`].
//! Transitions carry a [`Condition`](skein_core::Condition) evaluated
//! against the results accumulated so far.
//!
//! When a transition fires, the source's output is buffered at the target.
//! The target's join strategy decides when the buffer is sufficient; its
//! merge strategy folds the drained buffer into the payload the target runs
//! with. Runs execute either one unit at a time ([`Workflow::run`]) or on a
//! bounded worker pool ([`Workflow::run_parallel`]).

pub mod builtin;
pub mod condition;
pub mod definition;
mod executor;
pub mod join;
pub mod merge;
pub mod node;
pub mod state;
pub mod workflow;

pub use builtin::BuiltinBackend;
pub use condition::{Always, Compare, CompareOp, KeyPresent};
pub use definition::WorkflowDefinition;
pub use join::{AllJoin, CountJoin};
pub use merge::{IdentityMerge, ListMerge, ReduceMerge};
pub use node::{InputMode, Node, NodeOutcome, NodeSpec, UnitKind, WorkUnit};
pub use state::{StateGuard, StateManager};
pub use workflow::{Transition, Workflow};
