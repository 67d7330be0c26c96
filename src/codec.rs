//! Codec primitives consumed by the re-encoder.
//!
//! The size-fitting loop only needs to resize an image and encode it at a
//! given quality. [`Codec`] is that seam; [`ImageCodec`] implements it on
//! top of the `image` crate, with `oxipng` doing the PNG size optimization.

use crate::constants::{
    LIBDEFLATER_HIGH_LEVEL, LIBDEFLATER_LOW_LEVEL, MAX_QUALITY, MIN_QUALITY, OXIPNG_PRESET,
    PNG_HIGH_EFFORT_QUALITY,
};
use crate::error::{OptimizeError, Result};
use crate::formats::OutputFormat;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Frame};
use oxipng::{Deflaters, Options};
use std::borrow::Cow;
use std::io::Cursor;

/// Resize and encode operations used by the re-encoder.
pub trait Codec {
    /// Resample `image` to exactly `width` x `height`, returning a new image.
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;

    /// Encode `image` at `quality` (1-100) into an in-memory buffer.
    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>>;

    /// `false` when every quality yields the same bytes, so lowering it is
    /// pointless and only a smaller image can help.
    fn quality_sensitive(&self) -> bool {
        true
    }
}

/// [`Codec`] backed by the `image` crate for a single output format.
#[derive(Debug, Clone, Copy)]
pub struct ImageCodec {
    format: OutputFormat,
    filter: FilterType,
}

impl ImageCodec {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            filter: FilterType::Lanczos3,
        }
    }

    fn encode_jpeg(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
            // JPEG has no alpha channel; grayscale stays single-channel.
            let encoded = match image {
                DynamicImage::ImageLuma8(gray) => encoder.encode_image(gray),
                other => encoder.encode_image(&other.to_rgb8()),
            };
            encoded.map_err(OptimizeError::Encode)?;
        }
        Ok(bytes)
    }

    fn encode_png(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let mut raw = Cursor::new(Vec::new());
        image
            .write_to(&mut raw, image::ImageFormat::Png)
            .map_err(OptimizeError::Encode)?;

        let mut options = Options::from_preset(OXIPNG_PRESET);
        options.deflate = if quality >= PNG_HIGH_EFFORT_QUALITY {
            Deflaters::Libdeflater {
                compression: LIBDEFLATER_HIGH_LEVEL,
            }
        } else {
            Deflaters::Libdeflater {
                compression: LIBDEFLATER_LOW_LEVEL,
            }
        };

        oxipng::optimize_from_memory(raw.get_ref(), &options)
            .map_err(|e| OptimizeError::PngOptimization(e.to_string()))
    }

    fn encode_bmp(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        to_eight_bit(image)
            .write_to(&mut bytes, image::ImageFormat::Bmp)
            .map_err(OptimizeError::Encode)?;
        Ok(bytes.into_inner())
    }

    fn encode_gif(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        {
            // The GIF trailer is written when the encoder drops.
            let mut encoder = GifEncoder::new(&mut bytes);
            encoder
                .encode_frame(Frame::new(image.to_rgba8()))
                .map_err(OptimizeError::Encode)?;
        }
        Ok(bytes)
    }
}

impl Codec for ImageCodec {
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        image.resize_exact(width, height, self.filter)
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let quality = quality.clamp(MIN_QUALITY, MAX_QUALITY);
        match self.format {
            OutputFormat::Jpeg => self.encode_jpeg(image, quality),
            OutputFormat::Png => self.encode_png(image, quality),
            OutputFormat::Bmp => self.encode_bmp(image),
            OutputFormat::Gif => self.encode_gif(image),
        }
    }

    fn quality_sensitive(&self) -> bool {
        self.format.quality_sensitive()
    }
}

/// The BMP encoder only accepts 8-bit layouts.
fn to_eight_bit(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => Cow::Borrowed(image),
        other if other.color().has_alpha() => {
            Cow::Owned(DynamicImage::ImageRgba8(other.to_rgba8()))
        }
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    }
}
