#![allow(dead_code)]

use std::io::Cursor;

use tract_tensorflow::prelude::*;
use tract_tensorflow::tfpb;
use tract_tensorflow::tfpb::tensorflow::{DataType, NodeDef, TensorProto};

pub fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("IMAGEREC_LOG").try_init();
}

pub fn placeholder_f32(name: &str) -> NodeDef {
    tfpb::node().name(name).op("Placeholder").attr("dtype", DataType::DtFloat)
}

pub fn const_i32(name: &str, t: &Tensor) -> NodeDef {
    let value: TensorProto = t.try_into().unwrap();
    tfpb::node().name(name).op("Const").attr("dtype", DataType::DtInt32).attr("value", value)
}

pub fn reshape(name: &str, input: &str, shape: &str) -> NodeDef {
    tfpb::node()
        .name(name)
        .op("Reshape")
        .input(input)
        .input(shape)
        .attr("T", DataType::DtFloat)
        .attr("Tshape", DataType::DtInt32)
}

/// A "model" whose class probabilities are its flattened input: `[1, h, w, c]` -> `[1, h*w*c]`.
pub fn flatten_model() -> Vec<u8> {
    tfpb::graph()
        .node(placeholder_f32("input"))
        .node(const_i32("shape", &tensor1(&[1i32, -1])))
        .node(reshape("output", "input", "shape"))
        .write_to_bytes()
        .unwrap()
}

/// Same, but answers with a `[2, h*w*c/2]` tensor.
pub fn two_rows_model() -> Vec<u8> {
    tfpb::graph()
        .node(placeholder_f32("input"))
        .node(const_i32("shape", &tensor1(&[2i32, -1])))
        .node(reshape("output", "input", "shape"))
        .write_to_bytes()
        .unwrap()
}

/// Answers with its untouched rank-4 input.
pub fn identity_model() -> Vec<u8> {
    tfpb::graph()
        .node(placeholder_f32("input"))
        .node(
            tfpb::node().name("output").op("Identity").input("input").attr("T", DataType::DtFloat),
        )
        .write_to_bytes()
        .unwrap()
}

pub fn model_without_output() -> Vec<u8> {
    tfpb::graph()
        .node(placeholder_f32("input"))
        .node(const_i32("shape", &tensor1(&[1i32, -1])))
        .node(reshape("logits", "input", "shape"))
        .write_to_bytes()
        .unwrap()
}

pub fn solid_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut buf = Cursor::new(vec![]);
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageOutputFormat::Jpeg(95))
        .unwrap();
    buf.into_inner()
}
