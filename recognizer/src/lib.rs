//! # imagerec
//!
//! Single image classification with a frozen TensorFlow graph.
//!
//! Encoded image bytes go through a small preprocessing graph (decode, cast, batch, resize,
//! normalize) built op by op and run once, then through the frozen model, executed by
//! tract. The resulting probability vector is resolved against the label table.
//!
//! ```no_run
//! use imagerec::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let model = std::fs::read("tensorflow_inception_graph.pb")?;
//! let labels = std::fs::read_to_string("imagenet_comp_graph_label_strings.txt")?;
//! let recognizer =
//!     Recognizer::ready(RecognizerConfig::default(), &model, LabelTable::from_text(&labels))?;
//!
//! let best = recognizer.recognize(&std::fs::read("grace_hopper.jpg")?)?;
//! println!("BEST MATCH: {}", best);
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod config;
pub mod errors;
pub mod graph;
pub mod inference;
pub mod labels;
pub mod normalize;
pub mod ops;
pub mod recognizer;
pub mod session;

pub use errors::{RecognizeError, RecognizeResult};
pub use recognizer::{Recognizer, RecognizerState};

pub mod prelude {
    pub use crate::config::{NormalizationConfig, RecognizerConfig};
    pub use crate::errors::{RecognizeError, RecognizeResult};
    pub use crate::graph::{ComputationGraph, GraphBuilder, TensorHandle};
    pub use crate::inference::InferenceEngine;
    pub use crate::labels::{ClassificationResult, LabelTable};
    pub use crate::normalize::ImageNormalizer;
    pub use crate::ops::BinaryOp;
    pub use crate::recognizer::{Recognizer, RecognizerState};
    pub use crate::session::{Backend, Interpreter};
}

#[cfg(test)]
pub(crate) fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("IMAGEREC_LOG").try_init();
}

#[cfg(test)]
pub(crate) fn solid_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut buf = std::io::Cursor::new(vec![]);
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageOutputFormat::Jpeg(95))
        .unwrap();
    buf.into_inner()
}
