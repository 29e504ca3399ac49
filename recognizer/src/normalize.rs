use tract_core::prelude::*;

use crate::config::NormalizationConfig;
use crate::errors::{RecognizeError, RecognizeResult};
use crate::graph::{GraphBuilder, TensorHandle};
use crate::session::{Backend, Interpreter};

/// Turns encoded image bytes into the `[1, height, width, channels]` f32 tensor a model was
/// trained on.
#[derive(Clone, Debug)]
pub struct ImageNormalizer<B: Backend = Interpreter> {
    config: NormalizationConfig,
    backend: B,
}

impl ImageNormalizer<Interpreter> {
    pub fn new(config: NormalizationConfig) -> RecognizeResult<ImageNormalizer<Interpreter>> {
        ImageNormalizer::with_backend(config, Interpreter)
    }
}

impl<B: Backend> ImageNormalizer<B> {
    pub fn with_backend(config: NormalizationConfig, backend: B) -> RecognizeResult<Self> {
        config.validate()?;
        Ok(ImageNormalizer { config, backend })
    }

    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    /// Builds the preprocessing graph for `image` and runs it once.
    pub fn normalize(&self, image: &[u8]) -> RecognizeResult<Tensor> {
        if image.is_empty() {
            return Err(RecognizeError::InvalidInput("empty image buffer".into()));
        }
        let mut graph = self.backend.new_graph();
        let output = build(&mut graph, &self.config, image)?;
        let normalized = self.backend.run_once(graph, &output)?;
        debug!("normalized image to {:?}", normalized.shape());
        Ok(normalized)
    }
}

/// Wires decode -> cast -> batch -> resize -> (x - mean) / scale, returning the last output.
///
/// A constant holds the image since the graph is built for a single input.
pub fn build<G: GraphBuilder>(
    b: &mut G,
    config: &NormalizationConfig,
    image: &[u8],
) -> RecognizeResult<TensorHandle> {
    let input = b.constant("input", tensor1(image))?;
    let decoded = b.decode_image(&input, config.channels)?;
    let pixels = b.cast(&decoded, f32::datum_type())?;
    let make_batch = b.constant("make_batch", tensor0(0i32))?;
    let batch = b.expand_dims(&pixels, &make_batch)?;
    let size = b.constant("size", tensor1(&[config.height as i32, config.width as i32]))?;
    let resized = b.resize_bilinear(&batch, &size)?;
    let mean = b.constant("mean", tensor0(config.mean))?;
    let centered = b.sub(&resized, &mean)?;
    let scale = b.constant("scale", tensor0(config.scale))?;
    b.div(&centered, &scale)
}
