use crate::foundation::error::ExportResult;
use crate::pixel::buffer::{PixelBuffer, PixelFormat};
use anyhow::Context;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// List the still images in `dir`, sorted by file name.
///
/// Only regular files with a `jpg`, `jpeg` or `png` extension (any case) are returned;
/// subdirectories are not searched.
pub fn list_images(dir: &Path) -> ExportResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read image directory '{}'", dir.display()))?;

    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("list '{}'", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)));
        if is_image {
            out.push(path);
        }
    }
    out.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(out)
}

/// Decode an image file into a packed BGRA buffer.
pub fn load_image(path: &Path) -> ExportResult<PixelBuffer> {
    let img = image::open(path).with_context(|| format!("decode image '{}'", path.display()))?;
    let (width, height) = (img.width(), img.height());
    let mut data = img.into_rgba8().into_raw();
    for px in data.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    PixelBuffer::from_packed(width, height, PixelFormat::Bgra, data)
}

#[cfg(test)]
#[path = "../tests/unit/source.rs"]
mod tests;
