use crate::encode::codec::{VideoEncoder, find_encoder};
use crate::encode::muxer::{Muxer, OutputFormat};
use crate::encode::packet::StreamConfig;
use crate::foundation::core::{Rational, even_floor};
use crate::foundation::error::{ExportError, ExportResult};
use crate::pixel::buffer::PixelBuffer;
use std::path::{Path, PathBuf};

/// Lifecycle of an [`EncoderSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing allocated yet.
    Unconfigured,
    /// Encoder open and container header written; no frame yet.
    HeaderWritten,
    /// At least one frame was submitted.
    Encoding,
    /// Trailer written and everything released (or the session was aborted).
    Finalized,
}

/// Stream parameters requested by the caller; the session derives the [`StreamConfig`].
#[derive(Clone, Debug)]
pub struct StreamRequest {
    /// Requested picture width (floored to even).
    pub width: u32,
    /// Requested picture height (floored to even).
    pub height: u32,
    /// Codec time base.
    pub time_base: Rational,
    /// Target bit rate in bits per second.
    pub bit_rate: u64,
    /// Replace an existing output file.
    pub overwrite: bool,
}

struct ActiveStream {
    encoder: Box<dyn VideoEncoder>,
    muxer: Box<dyn Muxer>,
    config: StreamConfig,
    stream_time_base: Rational,
    output: Option<PathBuf>,
}

/// Owns the encoder + muxer pair for one output and sequences their calls.
///
/// `configure` -> `submit_frame`* -> `finalize`. Calls out of order return
/// [`ExportError::State`]. Dropping a session that was configured but never finalized aborts it
/// and removes the partially written output. A file the muxer never created is left alone.
pub struct EncoderSession {
    state: SessionState,
    active: Option<ActiveStream>,
    config: Option<StreamConfig>,
    stream_index: usize,
    packets_written: u64,
}

impl Default for EncoderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderSession {
    /// Create an unconfigured session.
    pub fn new() -> Self {
        Self {
            state: SessionState::Unconfigured,
            active: None,
            config: None,
            stream_index: 0,
            packets_written: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Stream configuration, once configured.
    pub fn config(&self) -> Option<&StreamConfig> {
        self.config.as_ref()
    }

    /// Time base the muxer stores timestamps in, while the session is active.
    pub fn stream_time_base(&self) -> Option<Rational> {
        self.active.as_ref().map(|a| a.stream_time_base)
    }

    /// Number of packets handed to the muxer.
    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /// Configure for `target`, choosing the container from its extension.
    #[tracing::instrument(skip_all, fields(target = %target.display()))]
    pub fn configure(&mut self, target: &Path, req: &StreamRequest) -> ExportResult<()> {
        let muxer = OutputFormat::guess(target)?.into_muxer();
        self.configure_with_muxer(muxer, Some(target), req)
    }

    /// Configure with an explicit muxer; `target` is required unless the muxer is `no_file`.
    pub fn configure_with_muxer(
        &mut self,
        mut muxer: Box<dyn Muxer>,
        target: Option<&Path>,
        req: &StreamRequest,
    ) -> ExportResult<()> {
        if self.state != SessionState::Unconfigured {
            return Err(ExportError::state(format!(
                "session can only be configured once (state {:?})",
                self.state
            )));
        }

        let flags = muxer.flags();
        let codec = muxer.default_codec();
        let config = StreamConfig {
            width: even_floor(req.width),
            height: even_floor(req.height),
            pixel_format: codec.pixel_format(),
            time_base: req.time_base,
            bit_rate: req.bit_rate,
            gop_size: 0,
            global_header: flags.global_header,
        };
        if config.width == 0 || config.height == 0 {
            return Err(ExportError::configuration(format!(
                "stream size {}x{} is empty after flooring to even",
                req.width, req.height
            )));
        }

        let mut encoder = find_encoder(codec);
        encoder
            .open(&config)
            .map_err(|e| as_configuration(e, "failed to open encoder"))?;

        let output = if flags.no_file {
            None
        } else {
            let path = target.ok_or_else(|| {
                ExportError::configuration(format!("{} muxer needs an output path", muxer.name()))
            })?;
            muxer
                .open_output(path, req.overwrite)
                .map_err(|e| as_configuration(e, "failed to open output"))?;
            Some(path.to_path_buf())
        };

        let stream_time_base = match muxer.write_header(&config) {
            Ok(tb) => tb,
            Err(e) => {
                discard_output(muxer.as_mut(), output.as_deref());
                return Err(as_configuration(e, "failed to write container header"));
            }
        };

        tracing::info!(
            muxer = muxer.name(),
            ?codec,
            width = config.width,
            height = config.height,
            time_base = %config.time_base,
            stream_time_base = %stream_time_base,
            "container header written"
        );

        self.config = Some(config.clone());
        self.active = Some(ActiveStream {
            encoder,
            muxer,
            config,
            stream_time_base,
            output,
        });
        self.packets_written = 0;
        self.state = SessionState::HeaderWritten;
        Ok(())
    }

    /// Encode one frame and write its packet.
    pub fn submit_frame(&mut self, frame: &PixelBuffer, pts: i64) -> ExportResult<()> {
        if !matches!(
            self.state,
            SessionState::HeaderWritten | SessionState::Encoding
        ) {
            return Err(ExportError::state(format!(
                "cannot submit a frame in state {:?}",
                self.state
            )));
        }
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| ExportError::state("session has no active stream"))?;

        active.encoder.send_frame(frame, pts)?;
        let mut pkt = active.encoder.receive_packet()?.ok_or_else(|| {
            ExportError::encode("intra-only encoder produced no packet for a frame")
        })?;
        pkt.rescale_ts(active.config.time_base, active.stream_time_base);
        pkt.stream_index = self.stream_index;
        active.muxer.write_packet(pkt)?;

        self.packets_written += 1;
        self.state = SessionState::Encoding;
        Ok(())
    }

    /// Write the trailer, release the encoder and close the output.
    #[tracing::instrument(skip(self))]
    pub fn finalize(&mut self) -> ExportResult<()> {
        match self.state {
            SessionState::HeaderWritten | SessionState::Encoding => {}
            SessionState::Finalized => {
                return Err(ExportError::state("session is already finalized"));
            }
            SessionState::Unconfigured => {
                return Err(ExportError::state("session was never configured"));
            }
        }
        let ActiveStream {
            encoder,
            mut muxer,
            output,
            ..
        } = self
            .active
            .take()
            .ok_or_else(|| ExportError::state("session has no active stream"))?;
        self.state = SessionState::Finalized;

        let trailer = muxer.write_trailer();
        drop(encoder);
        let closed = trailer.and_then(|()| match output {
            Some(_) => muxer.close_output(),
            None => Ok(()),
        });
        if let Err(e) = closed {
            discard_output(muxer.as_mut(), output.as_deref());
            return Err(e);
        }

        tracing::info!(packets = self.packets_written, "container trailer written");
        Ok(())
    }

    /// Drop the encoder and muxer without a trailer and delete any partial output the muxer
    /// created.
    pub fn abort(&mut self) {
        if let Some(mut active) = self.active.take() {
            tracing::warn!(
                packets = self.packets_written,
                "aborting export, discarding partial output"
            );
            discard_output(active.muxer.as_mut(), active.output.as_deref());
        }
        if self.state != SessionState::Unconfigured {
            self.state = SessionState::Finalized;
        }
    }
}

impl Drop for EncoderSession {
    fn drop(&mut self) {
        self.abort();
    }
}

fn as_configuration(e: ExportError, what: &str) -> ExportError {
    match e {
        ExportError::Configuration(_) => e,
        other => ExportError::configuration(format!("{what}: {other}")),
    }
}

/// Abort `muxer` and remove `output` if the muxer created it.
fn discard_output(muxer: &mut dyn Muxer, output: Option<&Path>) {
    let created = muxer.created_output();
    muxer.abort();
    if let Some(path) = output
        && created
    {
        remove_partial_output(path);
    }
}

fn remove_partial_output(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove partial output");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/session.rs"]
mod tests;
