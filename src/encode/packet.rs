use crate::foundation::core::Rational;
use crate::pixel::buffer::PixelFormat;

/// Codecs the exporter can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CodecId {
    /// GIF image data (LZW over a 256-color palette).
    Gif,
    /// Uncompressed frames, handed to an external muxer as-is.
    RawVideo,
}

impl CodecId {
    /// Pixel format the codec consumes natively.
    pub fn pixel_format(self) -> PixelFormat {
        match self {
            Self::Gif => PixelFormat::Rgb8,
            Self::RawVideo => PixelFormat::Yuv420p,
        }
    }
}

/// Video stream parameters fixed for the whole export.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StreamConfig {
    /// Codec picture width (always even).
    pub width: u32,
    /// Codec picture height (always even).
    pub height: u32,
    /// Pixel format frames must arrive in.
    pub pixel_format: PixelFormat,
    /// Codec time base; frame timestamps count ticks of this.
    pub time_base: Rational,
    /// Target bit rate in bits per second.
    pub bit_rate: u64,
    /// Distance between keyframes; 0 means every frame is a keyframe.
    pub gop_size: u32,
    /// Whether the container stores codec headers globally instead of per packet.
    pub global_header: bool,
}

/// One compressed frame on its way to the muxer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedPacket {
    /// Compressed payload.
    pub payload: Vec<u8>,
    /// Presentation timestamp.
    pub pts: i64,
    /// Display duration in the same time base as `pts`.
    pub duration: i64,
    /// Index of the stream this packet belongs to.
    pub stream_index: usize,
    /// Whether the packet decodes without reference to others.
    pub keyframe: bool,
}

impl EncodedPacket {
    /// Convert `pts` and `duration` from one time base to another.
    pub fn rescale_ts(&mut self, from: Rational, to: Rational) {
        if from == to {
            return;
        }
        self.pts = Rational::rescale(self.pts, from, to);
        self.duration = Rational::rescale(self.duration, from, to);
    }
}
