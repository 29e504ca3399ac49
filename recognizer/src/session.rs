use std::sync::Arc;

use tract_core::prelude::*;

use crate::errors::{RecognizeError, RecognizeResult};
use crate::graph::{ComputationGraph, GraphBuilder, TensorHandle};

/// An execution backend: hands out fresh graphs and runs them exactly once.
///
/// `run_once` takes the graph by value, so it is gone when the call returns, whatever the
/// outcome.
pub trait Backend: Send + Sync {
    type Graph: GraphBuilder;

    fn new_graph(&self) -> Self::Graph;

    fn run_once(&self, graph: Self::Graph, fetch: &TensorHandle) -> RecognizeResult<Tensor>;
}

/// Evaluates [`ComputationGraph`]s node by node in the calling thread.
#[derive(Copy, Clone, Debug, Default)]
pub struct Interpreter;

impl Backend for Interpreter {
    type Graph = ComputationGraph;

    fn new_graph(&self) -> ComputationGraph {
        ComputationGraph::new()
    }

    fn run_once(&self, graph: ComputationGraph, fetch: &TensorHandle) -> RecognizeResult<Tensor> {
        ExecutionContext::new(&graph).run(fetch)
    }
}

/// Per-run state: the values computed so far. Borrows the graph, so it can not outlive it.
#[derive(Debug)]
pub struct ExecutionContext<'g> {
    graph: &'g ComputationGraph,
    values: Vec<Option<Arc<Tensor>>>,
}

impl<'g> ExecutionContext<'g> {
    pub fn new(graph: &'g ComputationGraph) -> ExecutionContext<'g> {
        ExecutionContext { graph, values: vec![None; graph.len()] }
    }

    /// Computes `fetch` and whatever it depends on. Consumes the context.
    pub fn run(mut self, fetch: &TensorHandle) -> RecognizeResult<Tensor> {
        let target = self.graph.resolve(fetch)?;
        let needed = self.needed_by(target);
        let graph = self.graph;
        for node in graph.nodes().iter().take(target + 1) {
            if !needed[node.id] {
                continue;
            }
            let inputs = node
                .inputs
                .iter()
                .map(|&i| {
                    self.values[i].clone().ok_or_else(|| {
                        RecognizeError::Execution(anyhow::anyhow!(
                            "{} evaluated before its input #{}",
                            node.name,
                            i
                        ))
                    })
                })
                .collect::<RecognizeResult<TVec<_>>>()?;
            let value = node.op.eval(&inputs)?;
            trace!("{} -> {:?} {:?}", node.name, value.datum_type(), value.shape());
            self.values[node.id] = Some(value);
        }
        let value = self.values[target].take().ok_or_else(|| {
            RecognizeError::Execution(anyhow::anyhow!("{} was not computed", fetch))
        })?;
        Ok(Arc::try_unwrap(value).unwrap_or_else(|shared| (*shared).clone()))
    }

    // nodes only ever reference earlier nodes, so a single backward sweep is enough
    fn needed_by(&self, target: usize) -> Vec<bool> {
        let mut needed = vec![false; self.graph.len()];
        needed[target] = true;
        for id in (0..=target).rev() {
            if needed[id] {
                for &i in &self.graph.node(id).inputs {
                    needed[i] = true;
                }
            }
        }
        needed
    }
}
