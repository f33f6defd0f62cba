use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use clap::error::ErrorKind;
use seqexport::{CropRect, ExportError, ExportOpts, VideoExporter};

/// Exit status for invocations that match no accepted argument form.
const USAGE_EXIT: u8 = 255;

#[derive(Parser, Debug)]
#[command(
    name = "seqexport",
    version,
    about = "Export a directory of still images as an animated GIF (or any ffmpeg container)"
)]
struct Cli {
    /// Directory holding the input images (jpg/jpeg/png, taken in file name order).
    input_dir: PathBuf,

    /// Output file; the extension picks the container. Defaults to `<input_dir>.gif`.
    output: Option<PathBuf>,

    /// JSON file with export options; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Crop rectangle `x,y,width,height`; also sets the output size.
    #[arg(long)]
    crop: Option<CropRect>,

    /// Scale whole frames to the crop size instead of cropping.
    #[arg(long)]
    no_crop: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(USAGE_EXIT);
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_usage() => {
            eprintln!("{e}");
            ExitCode::from(USAGE_EXIT)
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ExportError> {
    if !cli.input_dir.is_dir() {
        return Err(ExportError::usage(format!(
            "'{}' is not a directory\nusage: seqexport <input_dir> [output_file]",
            cli.input_dir.display()
        )));
    }

    let mut opts = match &cli.config {
        Some(path) => ExportOpts::from_json_path(path)?,
        None => ExportOpts::default(),
    };
    if let Some(fps) = cli.fps {
        opts.frame_rate = fps;
    }
    if cli.crop.is_some() {
        opts.crop = cli.crop;
    }

    let images = seqexport::source::list_images(&cli.input_dir)?;
    if images.is_empty() {
        tracing::info!(dir = %cli.input_dir.display(), "no images found");
        return Ok(());
    }

    let output = match cli.output {
        Some(path) => path,
        None => default_output(&cli.input_dir)?,
    };

    let mut exporter = VideoExporter::new(opts);
    exporter.initialize_from_opts(&output, !cli.no_crop)?;
    for (index, path) in images.iter().enumerate() {
        tracing::info!("Processing {}", path.display());
        let frame = seqexport::source::load_image(path)?;
        let index = i64::try_from(index).context("too many input images")?;
        exporter.add_frame(&frame, index)?;
    }
    exporter.commit_file()?;

    tracing::info!(frames = images.len(), output = %output.display(), "export finished");
    Ok(())
}

/// `<input_dir>.gif`, next to the directory.
fn default_output(input_dir: &Path) -> Result<PathBuf, ExportError> {
    let dir = input_dir
        .canonicalize()
        .with_context(|| format!("resolve '{}'", input_dir.display()))?;
    let name = dir.file_name().ok_or_else(|| {
        ExportError::usage(format!(
            "cannot derive an output name from '{}'; pass an output file",
            dir.display()
        ))
    })?;
    let mut file = name.to_os_string();
    file.push(".gif");
    Ok(dir.with_file_name(file))
}
