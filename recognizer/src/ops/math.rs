use tract_core::prelude::tract_ndarray::{ArrayD, IxDyn, Zip};
use tract_core::prelude::*;

use crate::errors::{RecognizeError, RecognizeResult};

pub fn cast(input: &Tensor, dt: DatumType) -> RecognizeResult<Tensor> {
    Ok(input.cast_to_dt(dt).map_err(RecognizeError::Execution)?.into_owned())
}

pub fn sub(a: &Tensor, b: &Tensor) -> RecognizeResult<Tensor> {
    binary_f32("Sub", a, b, |a, b| a - b)
}

pub fn div(a: &Tensor, b: &Tensor) -> RecognizeResult<Tensor> {
    binary_f32("Div", a, b, |a, b| a / b)
}

/// Inserts a unit axis at `dim`, negative values counting from the end.
pub fn expand_dims(data: &Tensor, dim: &Tensor) -> RecognizeResult<Tensor> {
    if dim.len() != 1 {
        return Err(RecognizeError::InvalidInput(format!(
            "ExpandDims wants a single axis, got shape {:?}",
            dim.shape()
        )));
    }
    let dim = dim.cast_to_scalar::<i64>().map_err(RecognizeError::Execution)?;
    let rank = data.rank() as i64;
    if dim < -(rank + 1) || dim > rank {
        return Err(RecognizeError::InvalidInput(format!(
            "ExpandDims axis {} is out of range for rank {}",
            dim, rank
        )));
    }
    let axis = if dim < 0 { rank + 1 + dim } else { dim } as usize;
    let mut output = data.clone();
    output.insert_axis(axis).map_err(RecognizeError::Execution)?;
    Ok(output)
}

fn binary_f32(
    op: &'static str,
    a: &Tensor,
    b: &Tensor,
    f: impl Fn(f32, f32) -> f32,
) -> RecognizeResult<Tensor> {
    for t in [a, b] {
        if t.datum_type() != f32::datum_type() {
            return Err(RecognizeError::UnsupportedType { op, dt: t.datum_type() });
        }
    }
    let shape = broadcast_shape(a.shape(), b.shape()).ok_or_else(|| {
        RecognizeError::InvalidInput(format!(
            "{}: shapes {:?} and {:?} do not broadcast",
            op,
            a.shape(),
            b.shape()
        ))
    })?;
    let a = a.to_array_view::<f32>().map_err(RecognizeError::Execution)?;
    let b = b.to_array_view::<f32>().map_err(RecognizeError::Execution)?;
    let shape = IxDyn(&shape);
    let (Some(a), Some(b)) = (a.broadcast(shape.clone()), b.broadcast(shape)) else {
        return Err(RecognizeError::InvalidInput(format!("{}: broadcast failed", op)));
    };
    let output: ArrayD<f32> = Zip::from(&a).and(&b).map_collect(|&a, &b| f(a, b));
    Ok(output.into())
}

/// Numpy-style broadcast of two shapes, aligned on their trailing axes.
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<TVec<usize>> {
    let rank = a.len().max(b.len());
    let mut shape = tvec!();
    for ix in 0..rank {
        let da = if ix + a.len() >= rank { a[ix + a.len() - rank] } else { 1 };
        let db = if ix + b.len() >= rank { b[ix + b.len() - rank] } else { 1 };
        let d = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => return None,
        };
        shape.push(d);
    }
    Some(shape)
}
