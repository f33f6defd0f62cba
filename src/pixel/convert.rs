use crate::foundation::error::{ExportError, ExportResult};
use crate::pixel::buffer::{PixelBuffer, PixelFormat};
use image::imageops::FilterType;
use image::{GrayImage, RgbaImage};

/// Resampling filter used by every conversion stage (bicubic).
const FILTER: FilterType = FilterType::CatmullRom;

/// Source and destination description of one conversion context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConversionKey {
    /// Input pixel layout.
    pub src_format: PixelFormat,
    /// Input width in pixels.
    pub src_width: u32,
    /// Input height in pixels.
    pub src_height: u32,
    /// Output pixel layout.
    pub dst_format: PixelFormat,
    /// Output width in pixels.
    pub dst_width: u32,
    /// Output height in pixels.
    pub dst_height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    PackedToYuv,
    YuvToPacked,
    YuvToRgb8,
    YuvToYuv,
}

/// A scaling + color conversion context between two fixed (format, size) pairs.
///
/// Only conversions into or out of planar YUV 4:2:0 are supported; that is the hub every
/// pipeline stage goes through.
#[derive(Clone, Debug)]
pub struct ColorConverter {
    key: ConversionKey,
    route: Route,
}

impl ColorConverter {
    /// Build a context, failing with [`ExportError::ConversionContext`] for unsupported pairs.
    pub fn new(key: ConversionKey) -> ExportResult<Self> {
        let dims = [key.src_width, key.src_height, key.dst_width, key.dst_height];
        if dims.contains(&0) {
            return Err(ExportError::conversion_context(format!(
                "cannot convert {}x{} -> {}x{}: empty dimension",
                key.src_width, key.src_height, key.dst_width, key.dst_height
            )));
        }

        use PixelFormat::*;
        let route = match (key.src_format, key.dst_format) {
            (Bgra | Rgba, Yuv420p) => Route::PackedToYuv,
            (Yuv420p, Bgra | Rgba) => Route::YuvToPacked,
            (Yuv420p, Rgb8) => Route::YuvToRgb8,
            (Yuv420p, Yuv420p) => Route::YuvToYuv,
            (src, dst) => {
                return Err(ExportError::conversion_context(format!(
                    "no conversion from {src} to {dst}"
                )));
            }
        };

        if key.src_format.is_planar() && (key.src_width | key.src_height) & 1 != 0 {
            return Err(ExportError::conversion_context(format!(
                "planar source must have even dimensions, got {}x{}",
                key.src_width, key.src_height
            )));
        }
        if key.dst_format.is_planar() && (key.dst_width | key.dst_height) & 1 != 0 {
            return Err(ExportError::conversion_context(format!(
                "planar destination must have even dimensions, got {}x{}",
                key.dst_width, key.dst_height
            )));
        }

        Ok(Self { key, route })
    }

    /// The (format, size) pairs this context was built for.
    pub fn key(&self) -> ConversionKey {
        self.key
    }

    /// Convert `src` into a newly allocated buffer of the destination format and size.
    pub fn convert(&self, src: &PixelBuffer) -> ExportResult<PixelBuffer> {
        let k = &self.key;
        if src.format() != k.src_format || src.width() != k.src_width || src.height() != k.src_height
        {
            return Err(ExportError::validation(format!(
                "converter expects {} {}x{}, got {} {}x{}",
                k.src_format,
                k.src_width,
                k.src_height,
                src.format(),
                src.width(),
                src.height()
            )));
        }

        match self.route {
            Route::PackedToYuv => {
                let rgba = resample_rgba(src.to_rgba_image()?, k.dst_width, k.dst_height);
                rgba_to_yuv420p(&rgba)
            }
            Route::YuvToYuv => resample_yuv(src, k.dst_width, k.dst_height),
            Route::YuvToPacked | Route::YuvToRgb8 => {
                let yuv = resample_yuv(src, k.dst_width, k.dst_height)?;
                yuv420p_to_packed(&yuv, k.dst_format)
            }
        }
    }
}

fn resample_rgba(img: RgbaImage, width: u32, height: u32) -> RgbaImage {
    if img.dimensions() == (width, height) {
        return img;
    }
    image::imageops::resize(&img, width, height, FILTER)
}

fn resample_plane(src: &PixelBuffer, plane: usize, width: u32, height: u32) -> ExportResult<Vec<u8>> {
    let (row, rows) = src.plane_size(plane);
    let mut raw = Vec::with_capacity(row * rows);
    for y in 0..rows {
        raw.extend_from_slice(src.row(plane, y));
    }
    if (row, rows) == (width as usize, height as usize) {
        return Ok(raw);
    }
    let img = GrayImage::from_raw(row as u32, rows as u32, raw)
        .ok_or_else(|| ExportError::validation(format!("plane {plane} geometry mismatch")))?;
    Ok(image::imageops::resize(&img, width, height, FILTER).into_raw())
}

fn resample_yuv(src: &PixelBuffer, width: u32, height: u32) -> ExportResult<PixelBuffer> {
    let (cw, ch) = (width.div_ceil(2), height.div_ceil(2));
    let planes = vec![
        resample_plane(src, 0, width, height)?,
        resample_plane(src, 1, cw, ch)?,
        resample_plane(src, 2, cw, ch)?,
    ];
    let strides = vec![width as usize, cw as usize, cw as usize];
    PixelBuffer::from_planes(width, height, PixelFormat::Yuv420p, planes, strides)
}

/// BT.601 limited-range RGB -> Y.
pub(crate) fn rgb_to_y(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16) as u8
}

/// BT.601 limited-range RGB -> (U, V).
pub(crate) fn rgb_to_uv(r: u8, g: u8, b: u8) -> (u8, u8) {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
    let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
    (u as u8, v as u8)
}

/// BT.601 limited-range YUV -> RGB.
pub(crate) fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = 298 * (i32::from(y) - 16);
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;
    let clamp = |x: i32| ((x + 128) >> 8).clamp(0, 255) as u8;
    [
        clamp(c + 409 * e),
        clamp(c - 100 * d - 208 * e),
        clamp(c + 516 * d),
    ]
}

/// Quantize RGB to the `RRRGGGBB` layout, nearest level per channel.
pub(crate) fn rgb_to_rgb8(r: u8, g: u8, b: u8) -> u8 {
    let q = |c: u8, levels: u32| ((u32::from(c) * levels + 127) / 255) as u8;
    (q(r, 7) << 5) | (q(g, 7) << 2) | q(b, 3)
}

/// The 256-entry RGB palette matching [`PixelFormat::Rgb8`] indices.
pub fn rgb8_palette() -> Vec<u8> {
    let expand = |v: u8, levels: u32| ((u32::from(v) * 255 + levels / 2) / levels) as u8;
    (0u16..256)
        .flat_map(|i| {
            let i = i as u8;
            [expand(i >> 5, 7), expand((i >> 2) & 7, 7), expand(i & 3, 3)]
        })
        .collect()
}

fn rgba_to_yuv420p(img: &RgbaImage) -> ExportResult<PixelBuffer> {
    let (width, height) = img.dimensions();
    let mut out = PixelBuffer::new(width, height, PixelFormat::Yuv420p)?;

    for y in 0..height {
        let luma = out.row_mut(0, y as usize);
        for (x, dst) in luma.iter_mut().enumerate() {
            let p = img.get_pixel(x as u32, y).0;
            *dst = rgb_to_y(p[0], p[1], p[2]);
        }
    }

    let (cw, ch) = out.plane_size(1);
    for cy in 0..ch {
        let mut u_row = vec![0u8; cw];
        let mut v_row = vec![0u8; cw];
        for cx in 0..cw {
            let (mut r, mut g, mut b, mut n) = (0u32, 0u32, 0u32, 0u32);
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (x, y) = ((cx * 2 + dx) as u32, (cy * 2 + dy) as u32);
                if x < width && y < height {
                    let p = img.get_pixel(x, y).0;
                    r += u32::from(p[0]);
                    g += u32::from(p[1]);
                    b += u32::from(p[2]);
                    n += 1;
                }
            }
            let avg = |s: u32| ((s + n / 2) / n) as u8;
            let (u, v) = rgb_to_uv(avg(r), avg(g), avg(b));
            u_row[cx] = u;
            v_row[cx] = v;
        }
        out.row_mut(1, cy).copy_from_slice(&u_row);
        out.row_mut(2, cy).copy_from_slice(&v_row);
    }

    Ok(out)
}

fn yuv420p_to_packed(yuv: &PixelBuffer, format: PixelFormat) -> ExportResult<PixelBuffer> {
    let (width, height) = (yuv.width(), yuv.height());
    let mut out = PixelBuffer::new(width, height, format)?;

    for y in 0..height as usize {
        let luma = yuv.row(0, y);
        let u_row = yuv.row(1, y / 2);
        let v_row = yuv.row(2, y / 2);
        let dst = out.row_mut(0, y);
        for (x, &l) in luma.iter().enumerate() {
            let [r, g, b] = yuv_to_rgb(l, u_row[x / 2], v_row[x / 2]);
            match format {
                PixelFormat::Rgb8 => dst[x] = rgb_to_rgb8(r, g, b),
                PixelFormat::Rgba => dst[x * 4..x * 4 + 4].copy_from_slice(&[r, g, b, 255]),
                PixelFormat::Bgra => dst[x * 4..x * 4 + 4].copy_from_slice(&[b, g, r, 255]),
                PixelFormat::Yuv420p => {
                    return Err(ExportError::conversion_context(
                        "yuv420p is not a packed destination",
                    ));
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/convert.rs"]
mod tests;
