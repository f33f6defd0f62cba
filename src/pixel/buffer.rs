use crate::foundation::core::CropRect;
use crate::foundation::error::{ExportError, ExportResult};
use std::cell::Cell;

thread_local! {
    static LIVE_BUFFERS: Cell<usize> = const { Cell::new(0) };
}

/// Pixel layouts understood by the conversion pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PixelFormat {
    /// Packed 8-bit B, G, R, A (the in-memory layout of 32-bit desktop images).
    Bgra,
    /// Packed 8-bit R, G, B, A.
    Rgba,
    /// Planar Y, U, V with chroma subsampled 2x2.
    Yuv420p,
    /// Packed one byte per pixel, `RRRGGGBB`; doubles as an index into a fixed 256-color palette.
    Rgb8,
}

impl PixelFormat {
    /// Short lowercase name, matching `ffmpeg -pix_fmt` spelling.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bgra => "bgra",
            Self::Rgba => "rgba",
            Self::Yuv420p => "yuv420p",
            Self::Rgb8 => "rgb8",
        }
    }

    /// Number of planes a buffer of this format carries.
    pub fn plane_count(self) -> usize {
        match self {
            Self::Yuv420p => 3,
            Self::Bgra | Self::Rgba | Self::Rgb8 => 1,
        }
    }

    /// Return `true` when channels live in separate planes.
    pub fn is_planar(self) -> bool {
        self.plane_count() > 1
    }

    /// Return `true` for the packed 4-byte RGB layouts.
    pub fn is_packed_rgba(self) -> bool {
        matches!(self, Self::Bgra | Self::Rgba)
    }

    /// Byte size of one row and the number of rows, per plane.
    pub(crate) fn plane_geometry(self, width: u32, height: u32) -> Vec<(usize, usize)> {
        let (w, h) = (width as usize, height as usize);
        match self {
            Self::Bgra | Self::Rgba => vec![(w * 4, h)],
            Self::Rgb8 => vec![(w, h)],
            Self::Yuv420p => {
                let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
                vec![(w, h), (cw, ch), (cw, ch)]
            }
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Owned raw image: one byte buffer and one row stride per plane.
///
/// Buffers are short-lived: the pipeline allocates one right before a conversion stage and
/// drops it as soon as the next stage has consumed it.
#[derive(Debug)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    planes: Vec<Vec<u8>>,
    strides: Vec<usize>,
}

impl PixelBuffer {
    /// Allocate a zeroed buffer with tightly packed rows.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> ExportResult<Self> {
        if width == 0 || height == 0 {
            return Err(ExportError::validation(format!(
                "pixel buffer must be non-empty, got {width}x{height}"
            )));
        }
        let geometry = format.plane_geometry(width, height);
        let planes = geometry.iter().map(|&(row, rows)| vec![0u8; row * rows]).collect();
        let strides = geometry.iter().map(|&(row, _)| row).collect();
        Ok(Self::track(width, height, format, planes, strides))
    }

    /// Wrap a single tightly packed plane (packed formats only).
    pub fn from_packed(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> ExportResult<Self> {
        if format.is_planar() {
            return Err(ExportError::validation(format!(
                "{format} is planar; use PixelBuffer::from_planes"
            )));
        }
        let stride = format.plane_geometry(width, height)[0].0;
        Self::from_planes(width, height, format, vec![data], vec![stride])
    }

    /// Wrap caller-provided planes after checking them against the format's layout.
    pub fn from_planes(
        width: u32,
        height: u32,
        format: PixelFormat,
        planes: Vec<Vec<u8>>,
        strides: Vec<usize>,
    ) -> ExportResult<Self> {
        if width == 0 || height == 0 {
            return Err(ExportError::validation(format!(
                "pixel buffer must be non-empty, got {width}x{height}"
            )));
        }
        let geometry = format.plane_geometry(width, height);
        if planes.len() != geometry.len() || strides.len() != geometry.len() {
            return Err(ExportError::validation(format!(
                "{format} expects {} plane(s), got {} plane(s) / {} stride(s)",
                geometry.len(),
                planes.len(),
                strides.len()
            )));
        }
        for (i, ((plane, &stride), &(row, rows))) in
            planes.iter().zip(&strides).zip(&geometry).enumerate()
        {
            if stride < row {
                return Err(ExportError::validation(format!(
                    "plane {i} stride {stride} is shorter than a row ({row} bytes)"
                )));
            }
            let needed = stride * (rows - 1) + row;
            if plane.len() < needed {
                return Err(ExportError::validation(format!(
                    "plane {i} holds {} bytes, {needed} required",
                    plane.len()
                )));
            }
        }
        Ok(Self::track(width, height, format, planes, strides))
    }

    /// Build an RGBA buffer from an `image` crate RGBA8 image.
    pub fn from_rgba_image(img: image::RgbaImage) -> ExportResult<Self> {
        let (width, height) = img.dimensions();
        Self::from_packed(width, height, PixelFormat::Rgba, img.into_raw())
    }

    /// Copy a packed buffer into an `image` crate RGBA8 image, swizzling BGRA.
    pub fn to_rgba_image(&self) -> ExportResult<image::RgbaImage> {
        if !self.format.is_packed_rgba() {
            return Err(ExportError::validation(format!(
                "only packed RGBA/BGRA buffers convert to an RGBA image, got {}",
                self.format
            )));
        }
        let mut data = self.to_tight_bytes();
        if self.format == PixelFormat::Bgra {
            data.chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
        }
        image::RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| ExportError::validation("RGBA image size mismatch"))
    }

    fn track(
        width: u32,
        height: u32,
        format: PixelFormat,
        planes: Vec<Vec<u8>>,
        strides: Vec<usize>,
    ) -> Self {
        LIVE_BUFFERS.with(|n| n.set(n.get() + 1));
        Self {
            width,
            height,
            format,
            planes,
            strides,
        }
    }

    /// Number of buffers currently alive that were created on this thread.
    pub fn live_count() -> usize {
        LIVE_BUFFERS.with(Cell::get)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Row stride of plane `i` in bytes.
    pub fn stride(&self, i: usize) -> usize {
        self.strides[i]
    }

    /// Raw bytes of plane `i`, including any row padding.
    pub fn plane(&self, i: usize) -> &[u8] {
        &self.planes[i]
    }

    /// Visible bytes of row `y` in plane `i`.
    pub fn row(&self, i: usize, y: usize) -> &[u8] {
        let row = self.row_len(i);
        let start = y * self.strides[i];
        &self.planes[i][start..start + row]
    }

    /// Mutable visible bytes of row `y` in plane `i`.
    pub fn row_mut(&mut self, i: usize, y: usize) -> &mut [u8] {
        let row = self.row_len(i);
        let start = y * self.strides[i];
        &mut self.planes[i][start..start + row]
    }

    fn row_len(&self, i: usize) -> usize {
        self.format.plane_geometry(self.width, self.height)[i].0
    }

    /// Visible size of plane `i` as (bytes per row, rows).
    pub fn plane_size(&self, i: usize) -> (usize, usize) {
        self.format.plane_geometry(self.width, self.height)[i]
    }

    /// Copy all planes into one contiguous byte vector without row padding.
    pub fn to_tight_bytes(&self) -> Vec<u8> {
        let geometry = self.format.plane_geometry(self.width, self.height);
        let total = geometry.iter().map(|&(row, rows)| row * rows).sum();
        let mut out = Vec::with_capacity(total);
        for (i, &(_, rows)) in geometry.iter().enumerate() {
            for y in 0..rows {
                out.extend_from_slice(self.row(i, y));
            }
        }
        out
    }

    /// Copy out the `rect` region of a packed buffer.
    ///
    /// The result is always `rect.width x rect.height`. Pixels of `rect` that fall outside the
    /// image are zero, so a rectangle entirely outside the image yields an all-zero buffer.
    pub fn crop(&self, rect: CropRect) -> ExportResult<Self> {
        if self.format.is_planar() {
            return Err(ExportError::validation(format!(
                "cropping a planar {} buffer is not supported",
                self.format
            )));
        }
        let mut out = Self::new(rect.width, rect.height, self.format)?;
        let Some(overlap) = rect.clip_to(self.width, self.height) else {
            return Ok(out);
        };

        let bpp = self.row_len(0) / self.width as usize;
        let src_x = overlap.x as usize * bpp;
        let dst_x = (overlap.x - rect.x) as usize * bpp;
        let len = overlap.width as usize * bpp;
        for y in overlap.y..overlap.y + overlap.height {
            let src = &self.row(0, y as usize)[src_x..src_x + len];
            out.row_mut(0, (y - rect.y) as usize)[dst_x..dst_x + len].copy_from_slice(src);
        }
        Ok(out)
    }
}

impl Clone for PixelBuffer {
    fn clone(&self) -> Self {
        Self::track(
            self.width,
            self.height,
            self.format,
            self.planes.clone(),
            self.strides.clone(),
        )
    }
}

impl Drop for PixelBuffer {
    fn drop(&mut self) {
        LIVE_BUFFERS.with(|n| n.set(n.get().saturating_sub(1)));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/buffer.rs"]
mod tests;
