//! Run loops for [`Workflow`].
//!
//! Both entry points share one firing rule: commit a node's output, then,
//! under the same state lock, walk its outgoing transitions in
//! registration order, buffer the output at every target whose condition
//! holds, and drain + merge + enqueue each target whose join is satisfied.
//! They differ only in how queued units are executed.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use skein_core::error::{Result, SkeinError};
use skein_core::types::{Arrival, Payload, Results, RunId};

use crate::node::{Node, NodeOutcome, UnitKind, WorkUnit};
use crate::state::StateManager;
use crate::workflow::Workflow;

type InFlight = JoinSet<(String, Result<NodeOutcome>)>;

/// Transient bookkeeping for one run call.
struct RunContext {
    id: RunId,
    state: StateManager,
    queue: VecDeque<WorkUnit>,
    visits: HashMap<String, usize>,
    started: Instant,
}

impl Workflow {
    /// Execute the graph from `start`, one work unit at a time.
    ///
    /// Returns the last output of every node that produced one. The first
    /// error from a backend or policy is returned as-is and stops the run.
    pub async fn run(&self, start: &str, payload: Payload) -> Result<Results> {
        let mut run = self.begin(start, payload, "sequential")?;

        while let Some(unit) = run.queue.pop_front() {
            let node = self.dispatch(&mut run.visits, &unit)?;
            let name = unit.node;
            let outcome = node
                .run(unit.payload, unit.kind)
                .await
                .map_err(|e| node_failed(&run.id, &name, e))?;
            self.complete(&mut run, &name, outcome)?;
        }

        Ok(self.finish(run))
    }

    /// Execute the graph from `start` on a pool of at most `max_workers`
    /// concurrent node invocations (engine default when `None`).
    ///
    /// The controller reacts to whichever invocation finishes first. On
    /// error, every invocation still in flight is awaited and its result
    /// discarded before the error is returned. A panicking backend is
    /// re-raised on the caller after the same drain.
    pub async fn run_parallel(
        &self,
        start: &str,
        payload: Payload,
        max_workers: Option<usize>,
    ) -> Result<Results> {
        let max_workers = max_workers.unwrap_or(self.config.max_workers);
        if max_workers == 0 {
            return Err(SkeinError::Config("max_workers must be at least 1".into()));
        }

        let mut run = self.begin(start, payload, "parallel")?;
        let mut in_flight = InFlight::new();

        if let Err(e) = self.drive(&mut run, &mut in_flight, max_workers).await {
            drain(&run.id, &mut in_flight).await;
            return Err(e);
        }

        Ok(self.finish(run))
    }

    async fn drive(
        &self,
        run: &mut RunContext,
        in_flight: &mut InFlight,
        max_workers: usize,
    ) -> Result<()> {
        loop {
            while in_flight.len() < max_workers {
                let Some(unit) = run.queue.pop_front() else {
                    break;
                };
                let node = self.dispatch(&mut run.visits, &unit)?;
                in_flight.spawn(async move {
                    let outcome = node.run(unit.payload, unit.kind).await;
                    (unit.node, outcome)
                });
            }

            // Nothing in flight means nothing was queued either.
            let Some(joined) = in_flight.join_next().await else {
                return Ok(());
            };
            let (name, outcome) = match joined {
                Ok(done) => done,
                Err(e) if e.is_panic() => {
                    // Unwind like the sequential path, once siblings settle.
                    error!(run_id = %run.id, "Node panicked");
                    drain(&run.id, in_flight).await;
                    std::panic::resume_unwind(e.into_panic());
                }
                Err(e) => {
                    error!(run_id = %run.id, error = %e, "Worker task failed");
                    return Err(SkeinError::Worker(e.to_string()));
                }
            };
            let outcome = outcome.map_err(|e| node_failed(&run.id, &name, e))?;
            self.complete(run, &name, outcome)?;
        }
    }

    fn begin(&self, start: &str, payload: Payload, mode: &str) -> Result<RunContext> {
        if !self.nodes.contains_key(start) {
            return Err(SkeinError::GraphDefinition(format!(
                "start node '{}' is not registered",
                start
            )));
        }

        let id = RunId::new();
        info!(run_id = %id, start, mode, "Starting workflow run");

        let mut queue = VecDeque::new();
        queue.push_back(WorkUnit::entry(start, payload));
        Ok(RunContext {
            id,
            state: StateManager::new(),
            queue,
            visits: HashMap::new(),
            started: Instant::now(),
        })
    }

    /// Resolve the node for a unit and enforce the per-run visit limit.
    fn dispatch(&self, visits: &mut HashMap<String, usize>, unit: &WorkUnit) -> Result<Arc<Node>> {
        let node = self.nodes.get(&unit.node).cloned().ok_or_else(|| {
            SkeinError::GraphDefinition(format!("node '{}' is not registered", unit.node))
        })?;

        if unit.kind == UnitKind::Entry {
            let count = visits.entry(unit.node.clone()).or_insert(0);
            *count += 1;
            if let Some(limit) = self.config.max_node_visits {
                if *count > limit {
                    warn!(node = %unit.node, limit, "Node exceeded visit limit");
                    return Err(SkeinError::VisitLimitExceeded {
                        node: unit.node.clone(),
                        limit,
                    });
                }
            }
        }

        debug!(node = %unit.node, kind = ?unit.kind, "Dispatching work unit");
        Ok(node)
    }

    /// Commit an outcome and fire the transitions it enables.
    fn complete(&self, run: &mut RunContext, name: &str, outcome: NodeOutcome) -> Result<()> {
        let output = match outcome {
            NodeOutcome::Deferred { items } => {
                debug!(node = %name, items = items.len(), "Node deferred split elements");
                run.queue
                    .extend(items.into_iter().map(|item| WorkUnit::element(name, item)));
                return Ok(());
            }
            NodeOutcome::Produced(output) => output,
        };

        let mut state = run.state.lock();
        state.update_state(name, output.clone());

        for transition in self.outgoing(name) {
            if !transition.condition.evaluate(state.results())? {
                continue;
            }
            let target = self.nodes.get(&transition.target).ok_or_else(|| {
                SkeinError::GraphDefinition(format!(
                    "node '{}' is not registered",
                    transition.target
                ))
            })?;

            state.buffer_input(&transition.target, Arrival::new(name, output.clone()));
            if let Some(buffer) = state.drain_if_satisfied(&transition.target, target.join())? {
                let inputs = buffer.len();
                let merged = target.merge().merge(buffer)?;
                debug!(
                    source = %name,
                    target = %transition.target,
                    inputs,
                    "Transition fired, target enqueued"
                );
                run.queue.push_back(WorkUnit::entry(&transition.target, merged));
            } else {
                debug!(
                    source = %name,
                    target = %transition.target,
                    "Input buffered, join not yet satisfied"
                );
            }
        }
        Ok(())
    }

    fn finish(&self, run: RunContext) -> Results {
        let elapsed_ms = run.started.elapsed().as_millis() as u64;
        let results = run.state.into_results();
        info!(
            run_id = %run.id,
            nodes = results.len(),
            elapsed_ms,
            "Workflow run complete"
        );
        results
    }
}

fn node_failed(run_id: &RunId, node: &str, e: SkeinError) -> SkeinError {
    error!(run_id = %run_id, node, error = %e, "Node failed");
    e
}

/// Wait for every outstanding invocation, discarding what it returns.
async fn drain(run_id: &RunId, in_flight: &mut InFlight) {
    let outstanding = in_flight.len();
    if outstanding > 0 {
        debug!(run_id = %run_id, outstanding, "Draining in-flight nodes");
    }
    while in_flight.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Always;
    use crate::node::NodeSpec;
    use serde_json::json;
    use skein_core::traits::from_fn;

    fn add(name: &str, n: i64) -> NodeSpec {
        NodeSpec::new(
            name,
            from_fn("add", move |v: Payload| {
                Ok(json!(v.as_i64().unwrap_or_default() + n))
            }),
        )
    }

    #[tokio::test]
    async fn test_unknown_start_is_graph_error() {
        let wf = Workflow::new();
        let err = wf.run("nowhere", json!(1)).await.unwrap_err();
        assert!(err.is_graph_definition());
        let err = wf.run_parallel("nowhere", json!(1), Some(2)).await.unwrap_err();
        assert!(err.is_graph_definition());
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let mut wf = Workflow::new();
        wf.add_state(add("a", 1)).unwrap();
        let err = wf.run_parallel("a", json!(1), Some(0)).await.unwrap_err();
        assert!(matches!(err, SkeinError::Config(_)));
    }

    #[tokio::test]
    async fn test_single_node_run() {
        let mut wf = Workflow::new();
        wf.add_state(add("a", 1)).unwrap();
        let results = wf.run("a", json!(1)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("a"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_visit_limit_stops_cycle() {
        let config = skein_core::config::EngineConfig {
            max_workers: 2,
            max_node_visits: Some(3),
        };
        let mut wf = Workflow::with_config(config).unwrap();
        wf.add_state(add("loop", 1)).unwrap();
        wf.add_transition("loop", "loop", Always).unwrap();

        let err = wf.run("loop", json!(0)).await.unwrap_err();
        assert!(matches!(
            err,
            SkeinError::VisitLimitExceeded { ref node, limit: 3 } if node == "loop"
        ));
        let err = wf.run_parallel("loop", json!(0), None).await.unwrap_err();
        assert!(matches!(err, SkeinError::VisitLimitExceeded { .. }));
    }
}
