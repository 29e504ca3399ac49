use tract_tensorflow::prelude::*;

use crate::config::RecognizerConfig;
use crate::errors::{RecognizeError, RecognizeResult};

/// A frozen TensorFlow classifier, parsed, checked and optimized once.
///
/// The plan is immutable and shared by every caller; each `infer` call runs on its own
/// execution state which is dropped before the call returns.
#[derive(Debug)]
pub struct InferenceEngine {
    plan: TypedRunnableModel<TypedModel>,
    class_count: Option<usize>,
}

impl InferenceEngine {
    pub fn load(frozen: &[u8], config: &RecognizerConfig) -> RecognizeResult<InferenceEngine> {
        config.validate()?;
        if frozen.is_empty() {
            return Err(RecognizeError::configuration("frozen model is empty"));
        }
        let model = tract_tensorflow::tensorflow()
            .model_for_read(&mut &*frozen)
            .map_err(|e| RecognizeError::configuration_from("could not parse frozen model", e))?;
        for name in [&config.input_name, &config.output_name] {
            if model.node_by_name(name).is_err() {
                return Err(RecognizeError::configuration(format!(
                    "frozen model has no tensor named {:?}",
                    name
                )));
            }
        }
        let shape = config.normalization.input_shape();
        let model = model
            .with_input_names([config.input_name.as_str()])
            .and_then(|m| m.with_output_names([config.output_name.as_str()]))
            .and_then(|m| m.with_input_fact(0, f32::fact(shape).into()))
            .and_then(|m| m.into_optimized())
            .map_err(|e| {
                RecognizeError::configuration_from(
                    format!("frozen model does not accept f32 {:?} inputs", shape),
                    e,
                )
            })?;
        let class_count = model
            .output_fact(0)
            .ok()
            .and_then(|f| f.shape.as_concrete().and_then(|s| s.get(1).copied()));
        let plan = model
            .into_runnable()
            .map_err(|e| RecognizeError::configuration_from("could not plan frozen model", e))?;
        info!(
            "loaded frozen model, {} nodes, classes: {:?}",
            plan.model().nodes().len(),
            class_count
        );
        Ok(InferenceEngine { plan, class_count })
    }

    /// Number of classes, when the model declares it statically.
    pub fn class_count(&self) -> Option<usize> {
        self.class_count
    }

    pub fn infer(&self, normalized: Tensor) -> RecognizeResult<Vec<f32>> {
        let outputs = self.plan.run(tvec!(normalized.into())).map_err(RecognizeError::Execution)?;
        let output = outputs.first().ok_or_else(|| {
            RecognizeError::Execution(anyhow::anyhow!("model produced no output"))
        })?;
        probabilities(output)
    }
}

/// Strips the batch axis of a `[1, N]` tensor.
pub fn probabilities(output: &Tensor) -> RecognizeResult<Vec<f32>> {
    let shape = output.shape();
    if shape.len() != 2 || shape[0] != 1 {
        return Err(RecognizeError::ShapeMismatch(shape.to_vec()));
    }
    let output = output.cast_to::<f32>().map_err(RecognizeError::Execution)?;
    Ok(output.as_slice::<f32>().map_err(RecognizeError::Execution)?.to_vec())
}
