use image::ImageFormat;
use tract_core::prelude::*;

use crate::errors::{RecognizeError, RecognizeResult};

pub const SUPPORTED_CHANNELS: &[usize] = &[1, 3, 4];

pub fn check_channels(channels: usize) -> RecognizeResult<()> {
    if SUPPORTED_CHANNELS.contains(&channels) {
        Ok(())
    } else {
        Err(RecognizeError::InvalidInput(format!(
            "can not decode to {} channels, expected one of {:?}",
            channels, SUPPORTED_CHANNELS
        )))
    }
}

/// Decodes JPEG bytes (a rank-1 u8 tensor) into a `[height, width, channels]` u8 tensor.
pub fn decode_jpeg(contents: &Tensor, channels: usize) -> RecognizeResult<Tensor> {
    check_channels(channels)?;
    if contents.datum_type() != u8::datum_type() || contents.rank() != 1 {
        return Err(RecognizeError::InvalidInput(format!(
            "DecodeJpeg expects a rank-1 u8 tensor, got {:?} {:?}",
            contents.datum_type(),
            contents.shape()
        )));
    }
    let bytes = contents.as_slice::<u8>().map_err(RecognizeError::Execution)?;
    if bytes.is_empty() {
        return Err(RecognizeError::InvalidInput("empty image buffer".into()));
    }
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(RecognizeError::Decode)?;
    let (width, height) = (img.width() as usize, img.height() as usize);
    trace!("decoded {}x{} jpeg ({:?})", width, height, img.color());
    let pixels = match channels {
        1 => img.into_luma8().into_raw(),
        3 => img.into_rgb8().into_raw(),
        _ => img.into_rgba8().into_raw(),
    };
    Tensor::from_shape(&[height, width, channels], &pixels).map_err(RecognizeError::Execution)
}
