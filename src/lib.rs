//! Seqexport turns a sequence of still images into one animated output.
//!
//! Frames go through a two-stage color conversion (packed RGBA/BGRA -> planar YUV 4:2:0 ->
//! the codec's native format), are paced by input frame index, and are written by a
//! codec + container pair picked from the output file extension:
//!
//! - Create a [`VideoExporter`] and [`initialize`](VideoExporter::initialize) it
//! - Feed frames with [`add_frame`](VideoExporter::add_frame); repeated indices are skipped
//! - Finish with [`commit_file`](VideoExporter::commit_file)
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Encoders, muxers and the encoder session.
pub mod encode;
/// Frame pacing and export orchestration.
pub mod export;
/// Pixel buffers and color conversion.
pub mod pixel;
/// Directory listing and image decoding.
pub mod source;

pub use crate::foundation::core::{CropRect, Rational, even_floor};
pub use crate::foundation::error::{ExportError, ExportResult};

#[cfg(feature = "alloc-track")]
pub use crate::foundation::alloc_track::{AllocStats, count_allocations};

pub use crate::encode::codec::{GifEncoder, RawVideoEncoder, VideoEncoder, find_encoder};
pub use crate::encode::ffmpeg::FfmpegMuxer;
pub use crate::encode::gif::GifMuxer;
pub use crate::encode::muxer::{MuxLog, Muxer, MuxerFlags, NullMuxer, OutputFormat, PacketRecord};
pub use crate::encode::packet::{CodecId, EncodedPacket, StreamConfig};
pub use crate::encode::session::{EncoderSession, SessionState, StreamRequest};
pub use crate::export::exporter::{ExportOpts, VideoExporter};
pub use crate::export::sequencer::{Admission, FrameSequencer};
pub use crate::pixel::buffer::{PixelBuffer, PixelFormat};
pub use crate::pixel::chain::ConversionChain;
pub use crate::pixel::convert::{ColorConverter, ConversionKey};
