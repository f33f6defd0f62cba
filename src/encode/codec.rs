use crate::encode::packet::{CodecId, EncodedPacket, StreamConfig};
use crate::foundation::error::{ExportError, ExportResult};
use crate::pixel::buffer::PixelBuffer;
use std::borrow::Cow;

/// Send-frame / receive-packet encoder contract.
///
/// Every encoder here is intra-only: each `send_frame` makes exactly one packet available to
/// the next `receive_packet`, and a second `send_frame` before that packet is drained fails.
pub trait VideoEncoder: Send {
    /// Codec implemented by this encoder.
    fn id(&self) -> CodecId;
    /// Validate and adopt the stream configuration. Called once before any frame.
    fn open(&mut self, cfg: &StreamConfig) -> ExportResult<()>;
    /// Encode one frame stamped with `pts` (codec time base).
    fn send_frame(&mut self, frame: &PixelBuffer, pts: i64) -> ExportResult<()>;
    /// Take the next finished packet, if any.
    fn receive_packet(&mut self) -> ExportResult<Option<EncodedPacket>>;
}

/// Look up the encoder for `id`.
pub fn find_encoder(id: CodecId) -> Box<dyn VideoEncoder> {
    match id {
        CodecId::Gif => Box::new(GifEncoder::default()),
        CodecId::RawVideo => Box::new(RawVideoEncoder::default()),
    }
}

fn check_open(id: CodecId, cfg: &StreamConfig) -> ExportResult<()> {
    if cfg.pixel_format != id.pixel_format() {
        return Err(ExportError::configuration(format!(
            "{id:?} encoder needs {} frames, stream is configured for {}",
            id.pixel_format(),
            cfg.pixel_format
        )));
    }
    if cfg.width == 0 || cfg.height == 0 {
        return Err(ExportError::configuration(format!(
            "{id:?} encoder needs a non-empty picture, got {}x{}",
            cfg.width, cfg.height
        )));
    }
    Ok(())
}

fn check_frame<'a>(
    cfg: Option<&'a StreamConfig>,
    pending: &Option<EncodedPacket>,
    frame: &PixelBuffer,
) -> ExportResult<&'a StreamConfig> {
    let cfg = cfg.ok_or_else(|| ExportError::encode("encoder is not open"))?;
    if pending.is_some() {
        return Err(ExportError::encode(
            "previous packet was not received before the next frame",
        ));
    }
    if frame.format() != cfg.pixel_format
        || frame.width() != cfg.width
        || frame.height() != cfg.height
    {
        return Err(ExportError::encode(format!(
            "frame is {} {}x{}, encoder expects {} {}x{}",
            frame.format(),
            frame.width(),
            frame.height(),
            cfg.pixel_format,
            cfg.width,
            cfg.height
        )));
    }
    Ok(cfg)
}

/// GIF image-data encoder: `Rgb8` pixels in, LZW-compressed image data out.
///
/// The `Rgb8` byte of each pixel is used directly as its palette index, so packets pair with
/// the fixed 3-3-2 global palette written by the GIF muxer.
#[derive(Debug, Default)]
pub struct GifEncoder {
    cfg: Option<StreamConfig>,
    pending: Option<EncodedPacket>,
}

impl VideoEncoder for GifEncoder {
    fn id(&self) -> CodecId {
        CodecId::Gif
    }

    fn open(&mut self, cfg: &StreamConfig) -> ExportResult<()> {
        check_open(self.id(), cfg)?;
        if cfg.width > u32::from(u16::MAX) || cfg.height > u32::from(u16::MAX) {
            return Err(ExportError::configuration(format!(
                "GIF pictures are limited to 65535x65535, got {}x{}",
                cfg.width, cfg.height
            )));
        }
        self.cfg = Some(cfg.clone());
        Ok(())
    }

    fn send_frame(&mut self, frame: &PixelBuffer, pts: i64) -> ExportResult<()> {
        let cfg = check_frame(self.cfg.as_ref(), &self.pending, frame)?;

        let mut gif_frame = gif::Frame {
            width: cfg.width as u16,
            height: cfg.height as u16,
            buffer: Cow::Owned(frame.to_tight_bytes()),
            ..gif::Frame::default()
        };
        gif_frame.make_lzw_pre_encoded();

        self.pending = Some(EncodedPacket {
            payload: gif_frame.buffer.into_owned(),
            pts,
            duration: 1,
            stream_index: 0,
            keyframe: true,
        });
        Ok(())
    }

    fn receive_packet(&mut self) -> ExportResult<Option<EncodedPacket>> {
        Ok(self.pending.take())
    }
}

/// Pass-through encoder: the packet payload is the frame's planes, tightly packed.
#[derive(Debug, Default)]
pub struct RawVideoEncoder {
    cfg: Option<StreamConfig>,
    pending: Option<EncodedPacket>,
}

impl VideoEncoder for RawVideoEncoder {
    fn id(&self) -> CodecId {
        CodecId::RawVideo
    }

    fn open(&mut self, cfg: &StreamConfig) -> ExportResult<()> {
        check_open(self.id(), cfg)?;
        self.cfg = Some(cfg.clone());
        Ok(())
    }

    fn send_frame(&mut self, frame: &PixelBuffer, pts: i64) -> ExportResult<()> {
        check_frame(self.cfg.as_ref(), &self.pending, frame)?;
        self.pending = Some(EncodedPacket {
            payload: frame.to_tight_bytes(),
            pts,
            duration: 1,
            stream_index: 0,
            keyframe: true,
        });
        Ok(())
    }

    fn receive_packet(&mut self) -> ExportResult<Option<EncodedPacket>> {
        Ok(self.pending.take())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/codec.rs"]
mod tests;
