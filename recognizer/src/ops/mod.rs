use std::fmt;
use std::sync::Arc;

use tract_core::prelude::*;

use crate::errors::{RecognizeError, RecognizeResult};

pub mod decode;
pub mod math;
pub mod resize;

/// Two-input operations a graph builder knows how to wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Sub,
    Div,
    ResizeBilinear,
    ExpandDims,
}

impl BinaryOp {
    pub fn type_name(&self) -> &'static str {
        match self {
            BinaryOp::Sub => "Sub",
            BinaryOp::Div => "Div",
            BinaryOp::ResizeBilinear => "ResizeBilinear",
            BinaryOp::ExpandDims => "ExpandDims",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Const(Arc<Tensor>),
    Cast(DatumType),
    DecodeJpeg { channels: usize },
    Binary(BinaryOp),
}

impl Op {
    pub fn type_name(&self) -> &'static str {
        match self {
            Op::Const(_) => "Const",
            Op::Cast(_) => "Cast",
            Op::DecodeJpeg { .. } => "DecodeJpeg",
            Op::Binary(b) => b.type_name(),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Op::Const(_) => 0,
            Op::Cast(_) | Op::DecodeJpeg { .. } => 1,
            Op::Binary(_) => 2,
        }
    }

    pub fn eval(&self, inputs: &[Arc<Tensor>]) -> RecognizeResult<Arc<Tensor>> {
        if inputs.len() != self.arity() {
            return Err(RecognizeError::Arity {
                op: self.type_name(),
                expected: self.arity(),
                got: inputs.len(),
            });
        }
        let output = match self {
            Op::Const(value) => return Ok(value.clone()),
            Op::Cast(dt) => math::cast(&inputs[0], *dt)?,
            Op::DecodeJpeg { channels } => decode::decode_jpeg(&inputs[0], *channels)?,
            Op::Binary(BinaryOp::Sub) => math::sub(&inputs[0], &inputs[1])?,
            Op::Binary(BinaryOp::Div) => math::div(&inputs[0], &inputs[1])?,
            Op::Binary(BinaryOp::ExpandDims) => math::expand_dims(&inputs[0], &inputs[1])?,
            Op::Binary(BinaryOp::ResizeBilinear) => {
                resize::resize_bilinear(&inputs[0], &inputs[1])?
            }
        };
        Ok(output.into_arc_tensor())
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Op::Const(t) => write!(f, "Const {:?} {:?}", t.datum_type(), t.shape()),
            Op::Cast(dt) => write!(f, "Cast to {:?}", dt),
            Op::DecodeJpeg { channels } => write!(f, "DecodeJpeg ({} channels)", channels),
            Op::Binary(b) => write!(f, "{}", b.type_name()),
        }
    }
}
