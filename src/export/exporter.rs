use crate::encode::muxer::{Muxer, OutputFormat};
use crate::encode::packet::StreamConfig;
use crate::encode::session::{EncoderSession, StreamRequest};
use crate::export::sequencer::{Admission, FrameSequencer};
use crate::foundation::core::{CropRect, Rational};
use crate::foundation::error::{ExportError, ExportResult};
use crate::pixel::buffer::PixelBuffer;
use crate::pixel::chain::ConversionChain;
use anyhow::Context as _;
use std::borrow::Cow;
use std::path::Path;

/// Export options.
///
/// Every field has a default, so a JSON config file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportOpts {
    /// Nominal frames per second of the input sequence.
    pub frame_rate: u32,
    /// Time base multiplier. GIF delays have centisecond resolution, so the codec clock runs
    /// `speedup` times faster than the frame rate.
    pub speedup: u32,
    /// Target bit rate in bits per second (ignored by GIF).
    pub bit_rate: u64,
    /// Crop rectangle for [`VideoExporter::initialize_from_opts`]; `None` means
    /// [`ExportOpts::DEFAULT_CROP`]. Its size is the codec picture size even when cropping is
    /// disabled.
    pub crop: Option<CropRect>,
    /// Replace an existing output file.
    pub overwrite: bool,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            frame_rate: 24,
            speedup: 3,
            bit_rate: 400_000,
            crop: None,
            overwrite: true,
        }
    }
}

impl ExportOpts {
    /// Crop rectangle used when none is configured.
    pub const DEFAULT_CROP: CropRect = CropRect {
        x: 0,
        y: 0,
        width: 800,
        height: 600,
    };

    /// The configured crop rectangle, or [`Self::DEFAULT_CROP`].
    pub fn crop_rect(&self) -> CropRect {
        self.crop.unwrap_or(Self::DEFAULT_CROP)
    }

    /// Codec time base, `1 / (frame_rate * speedup)`.
    pub fn time_base(&self) -> ExportResult<Rational> {
        if self.frame_rate == 0 || self.speedup == 0 {
            return Err(ExportError::validation(format!(
                "frame rate and speedup must be non-zero, got {} and {}",
                self.frame_rate, self.speedup
            )));
        }
        let ticks = self
            .frame_rate
            .checked_mul(self.speedup)
            .and_then(|t| i32::try_from(t).ok())
            .ok_or_else(|| {
                ExportError::validation(format!(
                    "{} fps x {} overflows the time base",
                    self.frame_rate, self.speedup
                ))
            })?;
        Rational::new(1, ticks)
    }

    /// Load options from a JSON file.
    pub fn from_json_path(path: &Path) -> ExportResult<Self> {
        let f = std::fs::File::open(path)
            .with_context(|| format!("open config '{}'", path.display()))?;
        let opts: Self = serde_json::from_reader(std::io::BufReader::new(f))
            .with_context(|| format!("parse config '{}'", path.display()))?;
        opts.time_base()?;
        Ok(opts)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Active,
    Failed,
}

/// Turns a sequence of still images into one encoded output.
///
/// One export is `initialize`, any number of `add_frame`, then `commit_file`. After a commit
/// the exporter can be initialized again and timestamps restart at 1. A failed `add_frame`
/// aborts the export and removes the partial output; only a new `initialize` is accepted after
/// that.
pub struct VideoExporter {
    opts: ExportOpts,
    sequencer: FrameSequencer,
    session: EncoderSession,
    chain: Option<ConversionChain>,
    crop: Option<CropRect>,
    phase: Phase,
}

impl Default for VideoExporter {
    fn default() -> Self {
        Self::new(ExportOpts::default())
    }
}

impl VideoExporter {
    /// Create an idle exporter.
    pub fn new(opts: ExportOpts) -> Self {
        Self {
            opts,
            sequencer: FrameSequencer::new(),
            session: EncoderSession::new(),
            chain: None,
            crop: None,
            phase: Phase::Idle,
        }
    }

    /// Options this exporter was built with.
    pub fn opts(&self) -> &ExportOpts {
        &self.opts
    }

    /// Frame counter of the current export.
    pub fn sequencer(&self) -> &FrameSequencer {
        &self.sequencer
    }

    /// Stream configuration of the current export.
    pub fn stream_config(&self) -> Option<&StreamConfig> {
        match self.phase {
            Phase::Active => self.session.config(),
            Phase::Idle | Phase::Failed => None,
        }
    }

    /// Whether an export is in progress.
    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Start an export to `output_path`; the container is chosen from its extension.
    ///
    /// The codec picture size is `crop_rect`'s size floored to even, whether or not cropping
    /// is enabled. Without cropping, frames are scaled to that size.
    #[tracing::instrument(
        skip_all,
        fields(output = %output_path.display(), crop_enabled = crop_enabled, crop = ?crop_rect)
    )]
    pub fn initialize(
        &mut self,
        output_path: &Path,
        crop_enabled: bool,
        crop_rect: CropRect,
    ) -> ExportResult<()> {
        let muxer = OutputFormat::guess(output_path)?.into_muxer();
        self.initialize_with_muxer(muxer, Some(output_path), crop_enabled, crop_rect)
    }

    /// Start an export to `output_path` using the crop rectangle from the options.
    pub fn initialize_from_opts(
        &mut self,
        output_path: &Path,
        crop_enabled: bool,
    ) -> ExportResult<()> {
        let crop_rect = self.opts.crop_rect();
        self.initialize(output_path, crop_enabled, crop_rect)
    }

    /// [`initialize_from_opts`](Self::initialize_from_opts) on an explicit muxer.
    pub fn initialize_from_opts_with_muxer(
        &mut self,
        muxer: Box<dyn Muxer>,
        output_path: Option<&Path>,
        crop_enabled: bool,
    ) -> ExportResult<()> {
        let crop_rect = self.opts.crop_rect();
        self.initialize_with_muxer(muxer, output_path, crop_enabled, crop_rect)
    }

    /// Start an export on an explicit muxer. `output_path` may be `None` for `no_file` muxers.
    pub fn initialize_with_muxer(
        &mut self,
        muxer: Box<dyn Muxer>,
        output_path: Option<&Path>,
        crop_enabled: bool,
        crop_rect: CropRect,
    ) -> ExportResult<()> {
        if self.phase == Phase::Active {
            return Err(ExportError::state(
                "an export is already in progress; commit it first",
            ));
        }
        let req = StreamRequest {
            width: crop_rect.width,
            height: crop_rect.height,
            time_base: self.opts.time_base()?,
            bit_rate: self.opts.bit_rate,
            overwrite: self.opts.overwrite,
        };

        let mut session = EncoderSession::new();
        session.configure_with_muxer(muxer, output_path, &req)?;
        let chain = {
            let cfg = session
                .config()
                .ok_or_else(|| ExportError::state("configured session has no stream"))?;
            ConversionChain::new(cfg.pixel_format, cfg.width, cfg.height)?
        };

        self.session = session;
        self.chain = Some(chain);
        self.crop = crop_enabled.then_some(crop_rect);
        self.sequencer.reset();
        self.phase = Phase::Active;
        Ok(())
    }

    /// Offer the image for input frame `frame_index`.
    ///
    /// A repeated index returns [`Admission::Skip`] and does nothing else.
    pub fn add_frame(&mut self, frame: &PixelBuffer, frame_index: i64) -> ExportResult<Admission> {
        if self.phase != Phase::Active {
            return Err(ExportError::state(match self.phase {
                Phase::Failed => "the export failed; initialize a new one",
                _ => "add_frame called before initialize",
            }));
        }
        let admission = self.sequencer.admit(frame_index)?;
        let Admission::Accept { pts } = admission else {
            tracing::debug!(frame_index, "repeated frame skipped");
            return Ok(admission);
        };

        if let Err(e) = self.encode_frame(frame, pts) {
            self.fail(&e);
            return Err(e);
        }
        tracing::debug!(frame_index, pts, "frame encoded");
        Ok(admission)
    }

    fn encode_frame(&mut self, frame: &PixelBuffer, pts: i64) -> ExportResult<()> {
        let chain = self
            .chain
            .as_mut()
            .ok_or_else(|| ExportError::state("export has no conversion chain"))?;
        let source = match self.crop {
            Some(rect) => Cow::Owned(frame.crop(rect)?),
            None => Cow::Borrowed(frame),
        };
        let converted = chain.convert(&source)?;
        drop(source);
        self.session.submit_frame(&converted, pts)
    }

    fn fail(&mut self, err: &ExportError) {
        tracing::warn!(error = %err, "export failed");
        self.session.abort();
        self.chain = None;
        self.phase = Phase::Failed;
    }

    /// Finish the export: trailer, close, and reset the frame counter.
    #[tracing::instrument(skip(self))]
    pub fn commit_file(&mut self) -> ExportResult<()> {
        match self.phase {
            Phase::Active => {}
            Phase::Idle => return Err(ExportError::state("no export to commit")),
            Phase::Failed => {
                return Err(ExportError::state("the export failed; nothing to commit"));
            }
        }
        self.chain = None;
        let result = self.session.finalize();
        self.sequencer.reset();
        self.session = EncoderSession::new();
        self.phase = if result.is_ok() {
            Phase::Idle
        } else {
            Phase::Failed
        };
        result
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/exporter.rs"]
mod tests;
