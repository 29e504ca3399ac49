use tract_core::prelude::tract_ndarray::{Array4, ArrayView4, Ix4};
use tract_core::prelude::*;

use crate::errors::{RecognizeError, RecognizeResult};

#[derive(Copy, Clone, Debug, PartialEq)]
struct Sample {
    lower: usize,
    upper: usize,
    lerp: f32,
}

// legacy tensorflow sampling: no corner alignment, no half pixel offset
fn samples(input: usize, output: usize) -> Vec<Sample> {
    let scale = input as f32 / output as f32;
    (0..output)
        .map(|o| {
            let pos = o as f32 * scale;
            let lower = (pos.floor() as usize).min(input - 1);
            Sample { lower, upper: (lower + 1).min(input - 1), lerp: pos - pos.floor() }
        })
        .collect()
}

/// Resizes a `[batch, height, width, channels]` tensor to the `[height, width]` given in `size`.
pub fn resize_bilinear(images: &Tensor, size: &Tensor) -> RecognizeResult<Tensor> {
    if images.rank() != 4 {
        return Err(RecognizeError::InvalidInput(format!(
            "ResizeBilinear expects a rank-4 NHWC input, got shape {:?}",
            images.shape()
        )));
    }
    if size.shape() != [2] {
        return Err(RecognizeError::InvalidInput(format!(
            "ResizeBilinear size must be [height, width], got shape {:?}",
            size.shape()
        )));
    }
    let size = size.cast_to::<i64>().map_err(RecognizeError::Execution)?;
    let size = size.as_slice::<i64>().map_err(RecognizeError::Execution)?;
    if size.iter().any(|&d| d <= 0) {
        return Err(RecognizeError::InvalidInput(format!("invalid resize target {:?}", size)));
    }
    let (height, width) = (size[0] as usize, size[1] as usize);
    if images.shape()[1] == 0 || images.shape()[2] == 0 {
        return Err(RecognizeError::InvalidInput("can not resize an empty image".into()));
    }

    let images = images.cast_to::<f32>().map_err(RecognizeError::Execution)?;
    let view = images.to_array_view::<f32>().map_err(RecognizeError::Execution)?;
    let view: ArrayView4<f32> =
        view.into_dimensionality::<Ix4>().map_err(|e| RecognizeError::Execution(e.into()))?;
    let (batch, in_height, in_width, channels) = view.dim();
    let ys = samples(in_height, height);
    let xs = samples(in_width, width);

    let output = Array4::from_shape_fn((batch, height, width, channels), |(n, y, x, c)| {
        let (sy, sx) = (ys[y], xs[x]);
        let top_left = view[(n, sy.lower, sx.lower, c)];
        let top_right = view[(n, sy.lower, sx.upper, c)];
        let bottom_left = view[(n, sy.upper, sx.lower, c)];
        let bottom_right = view[(n, sy.upper, sx.upper, c)];
        let top = top_left + (top_right - top_left) * sx.lerp;
        let bottom = bottom_left + (bottom_right - bottom_left) * sx.lerp;
        top + (bottom - top) * sy.lerp
    });
    Ok(output.into_dyn().into())
}

#[cfg(test)]
mod test {
    use super::*;

    fn nhwc(rows: &[&[f32]]) -> Tensor {
        let h = rows.len();
        let w = rows[0].len();
        let data: Vec<f32> = rows.iter().flat_map(|r| r.iter().cloned()).collect();
        Tensor::from_shape(&[1, h, w, 1], &data).unwrap()
    }

    #[test]
    fn upscale_2x2_to_4x4() {
        let input = nhwc(&[&[0.0, 1.0], &[2.0, 3.0]]);
        let found = resize_bilinear(&input, &tensor1(&[4i32, 4])).unwrap();
        let expected = nhwc(&[
            &[0.0, 0.5, 1.0, 1.0],
            &[1.0, 1.5, 2.0, 2.0],
            &[2.0, 2.5, 3.0, 3.0],
            &[2.0, 2.5, 3.0, 3.0],
        ]);
        assert_eq!(found, expected);
    }

    #[test]
    fn downscale_picks_leading_pixels() {
        let input = nhwc(&[&[0.0, 1.0, 2.0, 3.0], &[4.0, 5.0, 6.0, 7.0]]);
        let found = resize_bilinear(&input, &tensor1(&[1i32, 2])).unwrap();
        assert_eq!(found, nhwc(&[&[0.0, 2.0]]));
    }

    #[test]
    fn identity_size() {
        let input = nhwc(&[&[3.0, 1.0], &[4.0, 1.5]]);
        let found = resize_bilinear(&input, &tensor1(&[2i32, 2])).unwrap();
        assert_eq!(found, input);
    }

    #[test]
    fn integer_input_gives_float_output() {
        let input = Tensor::from_shape(&[1, 1, 1, 3], &[1u8, 2, 3]).unwrap();
        let found = resize_bilinear(&input, &tensor1(&[2i32, 2])).unwrap();
        assert_eq!(found.datum_type(), f32::datum_type());
        assert_eq!(found.shape(), &[1, 2, 2, 3]);
    }

    #[test]
    fn bad_size() {
        let input = nhwc(&[&[0.0]]);
        assert!(resize_bilinear(&input, &tensor1(&[0i32, 2])).is_err());
        assert!(resize_bilinear(&input, &tensor1(&[2i32])).is_err());
        assert!(resize_bilinear(&tensor1(&[1f32]), &tensor1(&[2i32, 2])).is_err());
    }
}
