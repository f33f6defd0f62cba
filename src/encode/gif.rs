use crate::encode::ffmpeg::ensure_parent_dir;
use crate::encode::muxer::{Muxer, MuxerFlags};
use crate::encode::packet::{CodecId, EncodedPacket, StreamConfig};
use crate::foundation::core::Rational;
use crate::foundation::error::{ExportError, ExportResult};
use crate::pixel::convert::rgb8_palette;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

/// GIF frame delays are expressed in hundredths of a second.
pub const GIF_TIME_BASE: Rational = Rational { num: 1, den: 100 };

/// Animated GIF container writer.
///
/// The global palette is the fixed 3-3-2 palette, so `Rgb8` packets need no per-frame color
/// table. A frame's delay is only known once the following packet arrives, so one packet is
/// held back until then (or until the trailer, where its own duration is used).
#[derive(Default)]
pub struct GifMuxer {
    file: Option<BufWriter<File>>,
    encoder: Option<gif::Encoder<BufWriter<File>>>,
    width: u16,
    height: u16,
    pending: Option<EncodedPacket>,
    frames_written: u64,
    created: bool,
}

impl GifMuxer {
    /// Create a muxer with no output attached yet.
    pub fn new() -> Self {
        Self::default()
    }

    fn write_frame(&mut self, pkt: EncodedPacket, delay: i64) -> ExportResult<()> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| ExportError::encode("gif header was not written"))?;
        let frame = gif::Frame {
            width: self.width,
            height: self.height,
            delay: delay.clamp(1, i64::from(u16::MAX)) as u16,
            buffer: Cow::Owned(pkt.payload),
            ..gif::Frame::default()
        };
        encoder
            .write_lzw_pre_encoded_frame(&frame)
            .map_err(|e| ExportError::encode(format!("failed to write gif frame: {e}")))?;
        self.frames_written += 1;
        Ok(())
    }
}

impl Muxer for GifMuxer {
    fn name(&self) -> &'static str {
        "gif"
    }

    fn flags(&self) -> MuxerFlags {
        MuxerFlags::default()
    }

    fn default_codec(&self) -> CodecId {
        CodecId::Gif
    }

    fn open_output(&mut self, path: &Path, overwrite: bool) -> ExportResult<()> {
        ensure_parent_dir(path)?;
        if !overwrite && path.exists() {
            return Err(ExportError::configuration(format!(
                "output file '{}' already exists",
                path.display()
            )));
        }
        let file = File::create(path).map_err(|e| {
            ExportError::configuration(format!("failed to create '{}': {e}", path.display()))
        })?;
        self.file = Some(BufWriter::new(file));
        self.created = true;
        Ok(())
    }

    fn write_header(&mut self, cfg: &StreamConfig) -> ExportResult<Rational> {
        let file = self
            .file
            .take()
            .ok_or_else(|| ExportError::configuration("gif output is not open"))?;
        let (width, height) = (
            u16::try_from(cfg.width)
                .map_err(|_| ExportError::configuration("gif width exceeds 65535"))?,
            u16::try_from(cfg.height)
                .map_err(|_| ExportError::configuration("gif height exceeds 65535"))?,
        );

        let mut encoder = gif::Encoder::new(file, width, height, &rgb8_palette())
            .map_err(|e| ExportError::configuration(format!("failed to write gif header: {e}")))?;
        encoder
            .set_repeat(gif::Repeat::Infinite)
            .map_err(|e| ExportError::configuration(format!("failed to write gif loop block: {e}")))?;

        self.width = width;
        self.height = height;
        self.encoder = Some(encoder);
        Ok(GIF_TIME_BASE)
    }

    fn write_packet(&mut self, pkt: EncodedPacket) -> ExportResult<()> {
        if let Some(prev) = self.pending.take() {
            let delay = pkt.pts - prev.pts;
            self.write_frame(prev, delay)?;
        }
        self.pending = Some(pkt);
        Ok(())
    }

    fn write_trailer(&mut self) -> ExportResult<()> {
        if let Some(last) = self.pending.take() {
            let delay = last.duration;
            self.write_frame(last, delay)?;
        }
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| ExportError::encode("gif header was not written"))?;
        let file = encoder
            .into_inner()
            .map_err(|e| ExportError::encode(format!("failed to write gif trailer: {e}")))?;
        tracing::debug!(frames = self.frames_written, "gif trailer written");
        self.file = Some(file);
        Ok(())
    }

    fn close_output(&mut self) -> ExportResult<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .map_err(|e| ExportError::encode(format!("failed to flush gif output: {e}")))?;
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.pending = None;
        self.encoder = None;
        self.file = None;
    }

    fn created_output(&self) -> bool {
        self.created
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/gif.rs"]
mod tests;
