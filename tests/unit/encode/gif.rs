use super::*;
use crate::encode::codec::{GifEncoder, VideoEncoder};
use crate::pixel::buffer::{PixelBuffer, PixelFormat};
use std::path::PathBuf;

fn stream(width: u32, height: u32) -> StreamConfig {
    StreamConfig {
        width,
        height,
        pixel_format: PixelFormat::Rgb8,
        time_base: Rational::new(1, 72).unwrap(),
        bit_rate: 400_000,
        gop_size: 0,
        global_header: false,
    }
}

fn out_path(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_gif");
    std::fs::create_dir_all(&dir).unwrap();
    let p = dir.join(name);
    let _ = std::fs::remove_file(&p);
    p
}

fn packet(enc: &mut GifEncoder, fill: u8, pts: i64) -> EncodedPacket {
    let mut frame = PixelBuffer::new(4, 2, PixelFormat::Rgb8).unwrap();
    for y in 0..2 {
        frame.row_mut(0, y).fill(fill);
    }
    enc.send_frame(&frame, pts).unwrap();
    enc.receive_packet().unwrap().unwrap()
}

#[test]
fn delays_come_from_timestamp_gaps() {
    let path = out_path("delays.gif");
    let cfg = stream(4, 2);
    let mut enc = GifEncoder::default();
    enc.open(&cfg).unwrap();

    let mut mux = GifMuxer::new();
    mux.open_output(&path, true).unwrap();
    assert_eq!(mux.write_header(&cfg).unwrap(), GIF_TIME_BASE);
    for (fill, pts) in [(0xe0, 1), (0x1c, 3), (0x03, 4)] {
        mux.write_packet(packet(&mut enc, fill, pts)).unwrap();
    }
    mux.write_trailer().unwrap();
    mux.close_output().unwrap();

    let mut opts = gif::DecodeOptions::new();
    opts.set_color_output(gif::ColorOutput::Indexed);
    let mut dec = opts.read_info(File::open(&path).unwrap()).unwrap();
    assert_eq!((dec.width(), dec.height()), (4, 2));
    assert_eq!(dec.global_palette().map(<[u8]>::len), Some(256 * 3));

    let mut delays = Vec::new();
    let mut firsts = Vec::new();
    while let Some(frame) = dec.read_next_frame().unwrap() {
        delays.push(frame.delay);
        firsts.push(frame.buffer[0]);
        assert!(frame.buffer.iter().all(|&p| p == frame.buffer[0]));
    }
    assert_eq!(delays, vec![2, 1, 1]);
    assert_eq!(firsts, vec![0xe0, 0x1c, 0x03]);
}

#[test]
fn header_and_trailer_alone_make_a_valid_gif() {
    let path = out_path("empty.gif");
    let mut mux = GifMuxer::new();
    mux.open_output(&path, true).unwrap();
    mux.write_header(&stream(8, 6)).unwrap();
    mux.write_trailer().unwrap();
    mux.close_output().unwrap();

    let mut dec = gif::DecodeOptions::new()
        .read_info(File::open(&path).unwrap())
        .unwrap();
    assert_eq!((dec.width(), dec.height()), (8, 6));
    assert!(dec.read_next_frame().unwrap().is_none());
}

#[test]
fn existing_output_is_kept_without_overwrite() {
    let path = out_path("keep.gif");
    std::fs::write(&path, b"keep").unwrap();
    let mut mux = GifMuxer::new();
    assert!(matches!(
        mux.open_output(&path, false),
        Err(ExportError::Configuration(_))
    ));
    assert_eq!(std::fs::read(&path).unwrap(), b"keep");
    assert!(!mux.created_output());

    mux.open_output(&path, true).unwrap();
    assert!(mux.created_output());
}

#[test]
fn header_requires_open_output() {
    let mut mux = GifMuxer::new();
    assert!(mux.write_header(&stream(4, 4)).is_err());
}
