use crate::encode::ffmpeg::FfmpegMuxer;
use crate::encode::gif::GifMuxer;
use crate::encode::packet::{CodecId, EncodedPacket, StreamConfig};
use crate::foundation::core::Rational;
use crate::foundation::error::{ExportError, ExportResult};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Container capabilities a session needs to know about up front.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MuxerFlags {
    /// The muxer does its own IO (or none); the session must not open/close an output file.
    pub no_file: bool,
    /// Codec headers go into the container header rather than into each packet.
    pub global_header: bool,
}

/// Container writer contract.
///
/// Call order: `open_output` (unless `no_file`), `write_header`, any number of
/// `write_packet`, `write_trailer`, `close_output` (unless `no_file`).
pub trait Muxer: Send {
    /// Short format name used in logs.
    fn name(&self) -> &'static str;
    /// Static capabilities of this container.
    fn flags(&self) -> MuxerFlags;
    /// Codec this container stores by default.
    fn default_codec(&self) -> CodecId;
    /// Create the output file at `path`.
    fn open_output(&mut self, path: &Path, overwrite: bool) -> ExportResult<()>;
    /// Write the container header; returns the time base the stream is muxed in.
    fn write_header(&mut self, cfg: &StreamConfig) -> ExportResult<Rational>;
    /// Write one packet whose timestamps are already in the stream time base.
    fn write_packet(&mut self, pkt: EncodedPacket) -> ExportResult<()>;
    /// Flush anything buffered and write the container trailer.
    fn write_trailer(&mut self) -> ExportResult<()>;
    /// Flush and close the output file.
    fn close_output(&mut self) -> ExportResult<()>;
    /// Tear down without a trailer after a failed export. Must not fail.
    fn abort(&mut self) {}
    /// Whether this muxer created or truncated the file at the output path. Only such a file
    /// is removed when the export fails.
    fn created_output(&self) -> bool {
        false
    }
}

/// Output container families, chosen from the output path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Animated GIF written in-process.
    Gif,
    /// Packets are counted and dropped; nothing is written.
    Null,
    /// Any container the system `ffmpeg` can write, identified by extension.
    Ffmpeg(String),
}

impl OutputFormat {
    /// Guess the container from the file extension of `path`.
    pub fn guess(path: &Path) -> ExportResult<Self> {
        if path.as_os_str() == "null" {
            return Ok(Self::Null);
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| {
                ExportError::configuration(format!(
                    "could not deduce output format from '{}' (no file extension)",
                    path.display()
                ))
            })?;
        Ok(match ext.as_str() {
            "gif" => Self::Gif,
            "null" => Self::Null,
            _ => Self::Ffmpeg(ext),
        })
    }

    /// Allocate a muxer for this format.
    pub fn into_muxer(self) -> Box<dyn Muxer> {
        match self {
            Self::Gif => Box::new(GifMuxer::new()),
            Self::Null => Box::new(NullMuxer::new()),
            Self::Ffmpeg(_) => Box::new(FfmpegMuxer::new()),
        }
    }
}

/// Metadata of one packet seen by a [`NullMuxer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketRecord {
    /// Timestamp in the stream time base.
    pub pts: i64,
    /// Duration in the stream time base.
    pub duration: i64,
    /// Payload size in bytes.
    pub size: usize,
    /// Stream the packet was tagged with.
    pub stream_index: usize,
}

/// Everything a [`NullMuxer`] was asked to do.
#[derive(Clone, Debug, Default)]
pub struct MuxLog {
    /// Stream configuration passed to `write_header`.
    pub header: Option<StreamConfig>,
    /// Packets in write order.
    pub packets: Vec<PacketRecord>,
    /// Whether `write_trailer` ran.
    pub trailer_written: bool,
    /// Whether `abort` ran.
    pub aborted: bool,
}

/// In-memory muxer for tests and dry runs. Records packet metadata and drops payloads.
#[derive(Debug, Default)]
pub struct NullMuxer {
    log: Arc<Mutex<MuxLog>>,
    fail_after: Option<usize>,
    codec: Option<CodecId>,
}

impl NullMuxer {
    /// Create a muxer that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a muxer whose packet write fails once `n` packets were written.
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// Pretend the container's default codec is `codec` (GIF by default).
    pub fn with_codec(mut self, codec: CodecId) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Shared handle to the record of muxer calls.
    pub fn log(&self) -> Arc<Mutex<MuxLog>> {
        Arc::clone(&self.log)
    }

    fn with_log<T>(&self, f: impl FnOnce(&mut MuxLog) -> T) -> ExportResult<T> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| ExportError::encode("null muxer log is poisoned"))?;
        Ok(f(&mut log))
    }
}

impl Muxer for NullMuxer {
    fn name(&self) -> &'static str {
        "null"
    }

    fn flags(&self) -> MuxerFlags {
        MuxerFlags {
            no_file: true,
            global_header: false,
        }
    }

    fn default_codec(&self) -> CodecId {
        self.codec.unwrap_or(CodecId::Gif)
    }

    fn open_output(&mut self, _path: &Path, _overwrite: bool) -> ExportResult<()> {
        Err(ExportError::configuration("null muxer does not write files"))
    }

    fn write_header(&mut self, cfg: &StreamConfig) -> ExportResult<Rational> {
        self.with_log(|log| log.header = Some(cfg.clone()))?;
        Ok(cfg.time_base)
    }

    fn write_packet(&mut self, pkt: EncodedPacket) -> ExportResult<()> {
        let fail_after = self.fail_after;
        self.with_log(|log| {
            if fail_after.is_some_and(|n| log.packets.len() >= n) {
                return Err(ExportError::encode("injected packet write failure"));
            }
            log.packets.push(PacketRecord {
                pts: pkt.pts,
                duration: pkt.duration,
                size: pkt.payload.len(),
                stream_index: pkt.stream_index,
            });
            Ok(())
        })?
    }

    fn write_trailer(&mut self) -> ExportResult<()> {
        self.with_log(|log| log.trailer_written = true)
    }

    fn close_output(&mut self) -> ExportResult<()> {
        Ok(())
    }

    fn abort(&mut self) {
        let _ = self.with_log(|log| log.aborted = true);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/muxer.rs"]
mod tests;
