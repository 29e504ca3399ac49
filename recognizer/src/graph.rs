//! Symbolic, op-by-op graph construction.
//!
//! A [`ComputationGraph`] is filled through the [`GraphBuilder`] capability and then handed
//! over to a [`Backend`](crate::session::Backend) that consumes it. Every edit adds exactly one
//! node and returns the [`TensorHandle`] of its single output; nothing is computed until the
//! graph is run.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tract_core::prelude::*;

use crate::errors::{RecognizeError, RecognizeResult};
use crate::ops::{BinaryOp, Op, decode};

static NEXT_GRAPH_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GraphId(usize);

/// Symbolic reference to a node output. Only meaningful for the graph that issued it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TensorHandle {
    graph: GraphId,
    node: usize,
    name: String,
    output: usize,
}

impl TensorHandle {
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    pub fn node_name(&self) -> &str {
        &self.name
    }

    pub fn output(&self) -> usize {
        self.output
    }
}

impl fmt::Display for TensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.output)
    }
}

/// The graph construction primitives the image pipeline is written against.
///
/// Implementations decide what a node is; [`ComputationGraph`] is the one the interpreter
/// backend executes.
pub trait GraphBuilder {
    fn constant(&mut self, name: &str, value: Tensor) -> RecognizeResult<TensorHandle>;

    fn cast(&mut self, input: &TensorHandle, dt: DatumType) -> RecognizeResult<TensorHandle>;

    fn binary_op(
        &mut self,
        op: BinaryOp,
        a: &TensorHandle,
        b: &TensorHandle,
    ) -> RecognizeResult<TensorHandle>;

    fn decode_image(
        &mut self,
        contents: &TensorHandle,
        channels: usize,
    ) -> RecognizeResult<TensorHandle>;

    fn sub(&mut self, a: &TensorHandle, b: &TensorHandle) -> RecognizeResult<TensorHandle> {
        self.binary_op(BinaryOp::Sub, a, b)
    }

    fn div(&mut self, a: &TensorHandle, b: &TensorHandle) -> RecognizeResult<TensorHandle> {
        self.binary_op(BinaryOp::Div, a, b)
    }

    fn resize_bilinear(
        &mut self,
        images: &TensorHandle,
        size: &TensorHandle,
    ) -> RecognizeResult<TensorHandle> {
        self.binary_op(BinaryOp::ResizeBilinear, images, size)
    }

    fn expand_dims(
        &mut self,
        input: &TensorHandle,
        dim: &TensorHandle,
    ) -> RecognizeResult<TensorHandle> {
        self.binary_op(BinaryOp::ExpandDims, input, dim)
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: usize,
    pub name: String,
    pub op: Op,
    pub inputs: TVec<usize>,
}

#[derive(Debug)]
pub struct ComputationGraph {
    id: GraphId,
    nodes: Vec<Node>,
    names: HashMap<String, usize>,
}

impl Default for ComputationGraph {
    fn default() -> ComputationGraph {
        ComputationGraph::new()
    }
}

impl ComputationGraph {
    pub fn new() -> ComputationGraph {
        let id = GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed));
        ComputationGraph { id, nodes: vec![], names: HashMap::new() }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.names.get(name).map(|&id| &self.nodes[id])
    }

    /// Node id behind a handle, checking the handle was issued by this graph.
    pub fn resolve(&self, handle: &TensorHandle) -> RecognizeResult<usize> {
        if handle.graph != self.id || handle.output != 0 || handle.node >= self.nodes.len() {
            return Err(RecognizeError::ForeignHandle(handle.to_string()));
        }
        Ok(handle.node)
    }

    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        op: Op,
        inputs: &[&TensorHandle],
    ) -> RecognizeResult<TensorHandle> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(RecognizeError::DuplicateNode(name));
        }
        if inputs.len() != op.arity() {
            return Err(RecognizeError::Arity {
                op: op.type_name(),
                expected: op.arity(),
                got: inputs.len(),
            });
        }
        let inputs = inputs.iter().map(|h| self.resolve(h)).collect::<RecognizeResult<TVec<_>>>()?;
        let id = self.nodes.len();
        trace!("graph {:?}: #{} {:?} {} {:?}", self.id, id, name, op, inputs);
        self.names.insert(name.clone(), id);
        self.nodes.push(Node { id, name: name.clone(), op, inputs });
        Ok(TensorHandle { graph: self.id, node: id, name, output: 0 })
    }
}

impl GraphBuilder for ComputationGraph {
    fn constant(&mut self, name: &str, value: Tensor) -> RecognizeResult<TensorHandle> {
        self.add_node(name, Op::Const(Arc::new(value)), &[])
    }

    fn cast(&mut self, input: &TensorHandle, dt: DatumType) -> RecognizeResult<TensorHandle> {
        self.add_node("Cast", Op::Cast(dt), &[input])
    }

    fn binary_op(
        &mut self,
        op: BinaryOp,
        a: &TensorHandle,
        b: &TensorHandle,
    ) -> RecognizeResult<TensorHandle> {
        self.add_node(op.type_name(), Op::Binary(op), &[a, b])
    }

    fn decode_image(
        &mut self,
        contents: &TensorHandle,
        channels: usize,
    ) -> RecognizeResult<TensorHandle> {
        decode::check_channels(channels)?;
        self.add_node("DecodeJpeg", Op::DecodeJpeg { channels }, &[contents])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn edits_add_one_node_each() {
        let mut g = ComputationGraph::new();
        let a = g.constant("a", tensor0(1f32)).unwrap();
        let b = g.constant("b", tensor0(2f32)).unwrap();
        let c = g.sub(&a, &b).unwrap();
        assert_eq!(g.len(), 3);
        assert_eq!(c.node_name(), "Sub");
        assert_eq!(c.output(), 0);
        assert_eq!(g.node_by_name("Sub").unwrap().inputs, tvec!(0, 1));
    }

    #[test]
    fn duplicate_constant_name() {
        let mut g = ComputationGraph::new();
        g.constant("mean", tensor0(117f32)).unwrap();
        let err = g.constant("mean", tensor0(1f32)).unwrap_err();
        assert!(matches!(err, RecognizeError::DuplicateNode(ref n) if n == "mean"));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn unnamed_ops_collide_on_their_type() {
        let mut g = ComputationGraph::new();
        let a = g.constant("a", tensor0(1f32)).unwrap();
        g.div(&a, &a).unwrap();
        assert!(matches!(g.div(&a, &a), Err(RecognizeError::DuplicateNode(_))));
    }

    #[test]
    fn handles_are_bound_to_their_graph() {
        let mut g1 = ComputationGraph::new();
        let mut g2 = ComputationGraph::new();
        let a = g1.constant("a", tensor0(1f32)).unwrap();
        assert_ne!(g1.id(), g2.id());
        let err = g2.cast(&a, f32::datum_type()).unwrap_err();
        assert!(matches!(err, RecognizeError::ForeignHandle(_)));
        assert!(g2.is_empty());
    }

    #[test]
    fn arity_is_checked() {
        let mut g = ComputationGraph::new();
        let a = g.constant("a", tensor0(1f32)).unwrap();
        let err = g.add_node("Sub", Op::Binary(BinaryOp::Sub), &[&a]).unwrap_err();
        assert!(matches!(err, RecognizeError::Arity { op: "Sub", expected: 2, got: 1 }));
        assert!(err.is_internal());
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn decode_image_checks_channels() {
        let mut g = ComputationGraph::new();
        let bytes = g.constant("input", tensor1(&[0u8])).unwrap();
        assert!(matches!(g.decode_image(&bytes, 2), Err(RecognizeError::InvalidInput(_))));
        let decoded = g.decode_image(&bytes, 3).unwrap();
        assert_eq!(decoded.node_name(), "DecodeJpeg");
    }
}
