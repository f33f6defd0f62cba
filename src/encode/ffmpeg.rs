use crate::encode::muxer::{Muxer, MuxerFlags};
use crate::encode::packet::{CodecId, EncodedPacket, StreamConfig};
use crate::foundation::core::Rational;
use crate::foundation::error::{ExportError, ExportResult};
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

/// Muxer that spawns the system `ffmpeg` and streams raw frames to its stdin.
///
/// `ffmpeg` picks the codec and container from the output extension, so this covers every
/// format other than GIF. Packets must come from the raw-video encoder.
#[derive(Default)]
pub struct FfmpegMuxer {
    out_path: Option<PathBuf>,
    overwrite: bool,
    frame_len: usize,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    spawned: bool,
}

impl FfmpegMuxer {
    /// Create a muxer with no output attached yet.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Muxer for FfmpegMuxer {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn flags(&self) -> MuxerFlags {
        MuxerFlags::default()
    }

    fn default_codec(&self) -> CodecId {
        CodecId::RawVideo
    }

    fn open_output(&mut self, path: &Path, overwrite: bool) -> ExportResult<()> {
        ensure_parent_dir(path)?;
        if !overwrite && path.exists() {
            return Err(ExportError::configuration(format!(
                "output file '{}' already exists",
                path.display()
            )));
        }
        self.out_path = Some(path.to_path_buf());
        self.overwrite = overwrite;
        Ok(())
    }

    fn write_header(&mut self, cfg: &StreamConfig) -> ExportResult<Rational> {
        let out_path = self
            .out_path
            .clone()
            .ok_or_else(|| ExportError::configuration("ffmpeg output is not open"))?;
        if !is_ffmpeg_on_path() {
            return Err(ExportError::configuration(
                "ffmpeg is required for non-GIF output, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if self.overwrite { "-y" } else { "-n" });

        // Input: raw frames exactly as the raw-video encoder lays them out.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            cfg.pixel_format.name(),
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        // One tick per frame, so the frame rate is the inverse time base.
        let rate = cfg.time_base.inverse();
        cmd.args(["-r", &rate.to_string()]);
        cmd.args(["-i", "pipe:0", "-an", "-g", &cfg.gop_size.max(1).to_string()]);
        cmd.args(["-b:v", &cfg.bit_rate.to_string()]);
        cmd.arg(&out_path);

        let mut child = cmd.spawn().map_err(|e| {
            ExportError::configuration(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        self.spawned = true;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExportError::configuration("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExportError::configuration("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.frame_len = cfg
            .pixel_format
            .plane_geometry(cfg.width, cfg.height)
            .iter()
            .map(|&(row, rows)| row * rows)
            .sum();
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        Ok(cfg.time_base)
    }

    fn write_packet(&mut self, pkt: EncodedPacket) -> ExportResult<()> {
        if pkt.payload.len() != self.frame_len {
            return Err(ExportError::encode(format!(
                "raw packet holds {} bytes, a frame is {}",
                pkt.payload.len(),
                self.frame_len
            )));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ExportError::encode("ffmpeg muxer is not running"));
        };
        stdin.write_all(&pkt.payload).map_err(|e| {
            ExportError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn write_trailer(&mut self) -> ExportResult<()> {
        // Closing stdin is ffmpeg's end-of-stream; it writes the real trailer itself.
        drop(self.stdin.take());
        Ok(())
    }

    fn close_output(&mut self) -> ExportResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ExportError::encode("ffmpeg muxer not started"))?;

        let status = child.wait().map_err(|e| {
            ExportError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ExportError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ExportError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ExportError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }

    /// The output file belongs to `ffmpeg` once it has been spawned; before that it is untouched.
    fn created_output(&self) -> bool {
        self.spawned
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ExportResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
