use crate::foundation::core::{CropRect, even_floor};
use crate::foundation::error::{ExportError, ExportResult};
use crate::pixel::buffer::{PixelBuffer, PixelFormat};
use crate::pixel::convert::{ColorConverter, ConversionKey};
use std::borrow::Cow;

/// Two-stage conversion from a packed source image to the codec's native pixel format.
///
/// Going straight from packed RGB to the codec's palette format bands visibly; routing through
/// planar YUV 4:2:0 first gives a much cleaner result. Each stage keeps the context it used
/// last and rebuilds it only when the source format or size changes, so a run of mixed input
/// sizes holds at most two contexts.
#[derive(Debug)]
pub struct ConversionChain {
    target_format: PixelFormat,
    target_width: u32,
    target_height: u32,
    to_intermediate: Option<ColorConverter>,
    to_target: Option<ColorConverter>,
}

impl ConversionChain {
    /// Intermediate layout between the two stages.
    pub const INTERMEDIATE: PixelFormat = PixelFormat::Yuv420p;

    /// Create a chain that produces `target_format` frames of `width` x `height`.
    pub fn new(target_format: PixelFormat, width: u32, height: u32) -> ExportResult<Self> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(ExportError::conversion_context(format!(
                "target size must be even and non-zero, got {width}x{height}"
            )));
        }
        Ok(Self {
            target_format,
            target_width: width,
            target_height: height,
            to_intermediate: None,
            to_target: None,
        })
    }

    /// Output format and size as `(format, width, height)`.
    pub fn target(&self) -> (PixelFormat, u32, u32) {
        (self.target_format, self.target_width, self.target_height)
    }

    /// Keys of the conversion contexts currently held, first stage first.
    pub fn cached_keys(&self) -> impl Iterator<Item = ConversionKey> + '_ {
        [&self.to_intermediate, &self.to_target]
            .into_iter()
            .flatten()
            .map(ColorConverter::key)
    }

    /// Convert `source` into the target format and size.
    ///
    /// Odd source dimensions are floored to even before the first stage; the dropped
    /// column/row never reaches a converter.
    pub fn convert(&mut self, source: &PixelBuffer) -> ExportResult<PixelBuffer> {
        let width = even_floor(source.width());
        let height = even_floor(source.height());
        if width == 0 || height == 0 {
            return Err(ExportError::conversion_context(format!(
                "source {}x{} has no even-sized area to convert",
                source.width(),
                source.height()
            )));
        }

        let normalized = if (width, height) == (source.width(), source.height()) {
            Cow::Borrowed(source)
        } else {
            Cow::Owned(source.crop(CropRect::new(0, 0, width, height))?)
        };

        let intermediate = cached(
            &mut self.to_intermediate,
            ConversionKey {
                src_format: source.format(),
                src_width: width,
                src_height: height,
                dst_format: Self::INTERMEDIATE,
                dst_width: width,
                dst_height: height,
            },
        )?
        .convert(&normalized)?;
        drop(normalized);

        let key = ConversionKey {
            src_format: Self::INTERMEDIATE,
            src_width: width,
            src_height: height,
            dst_format: self.target_format,
            dst_width: self.target_width,
            dst_height: self.target_height,
        };
        cached(&mut self.to_target, key)?.convert(&intermediate)
    }
}

fn cached(
    slot: &mut Option<ColorConverter>,
    key: ConversionKey,
) -> ExportResult<&ColorConverter> {
    if slot.as_ref().is_none_or(|c| c.key() != key) {
        tracing::debug!(?key, "building conversion context");
        *slot = Some(ColorConverter::new(key)?);
    }
    slot.as_ref()
        .ok_or_else(|| ExportError::conversion_context("conversion context was not built"))
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/chain.rs"]
mod tests;
