use super::*;
use crate::encode::muxer::{MuxLog, NullMuxer};
use crate::pixel::buffer::PixelFormat;
use std::sync::{Arc, Mutex};

const RECT: CropRect = CropRect {
    x: 0,
    y: 0,
    width: 8,
    height: 6,
};

fn bgra(width: u32, height: u32, px: [u8; 4]) -> PixelBuffer {
    PixelBuffer::from_packed(
        width,
        height,
        PixelFormat::Bgra,
        px.repeat((width * height) as usize),
    )
    .unwrap()
}

fn null_export(exporter: &mut VideoExporter, mux: NullMuxer) -> Arc<Mutex<MuxLog>> {
    let log = mux.log();
    exporter
        .initialize_with_muxer(Box::new(mux), None, true, RECT)
        .unwrap();
    log
}

fn packet_pts(log: &Arc<Mutex<MuxLog>>) -> Vec<i64> {
    log.lock().unwrap().packets.iter().map(|p| p.pts).collect()
}

#[test]
fn default_options_give_a_1_72_time_base() {
    let opts = ExportOpts::default();
    assert_eq!(opts.time_base().unwrap(), Rational::new(1, 72).unwrap());
    assert!(opts.overwrite);
    assert_eq!(opts.bit_rate, 400_000);

    let zero = ExportOpts {
        frame_rate: 0,
        ..ExportOpts::default()
    };
    assert!(matches!(zero.time_base(), Err(ExportError::Validation(_))));
}

#[test]
fn options_load_partial_json() {
    let dir = std::path::PathBuf::from("target").join("unit_exporter");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("opts.json");
    std::fs::write(&path, r#"{ "frame_rate": 10, "crop": { "x": 1, "y": 2, "width": 30, "height": 20 } }"#)
        .unwrap();

    let opts = ExportOpts::from_json_path(&path).unwrap();
    assert_eq!(opts.frame_rate, 10);
    assert_eq!(opts.speedup, 3);
    assert_eq!(opts.crop, Some(CropRect::new(1, 2, 30, 20)));
    assert_eq!(opts.time_base().unwrap(), Rational::new(1, 30).unwrap());

    assert!(ExportOpts::from_json_path(&dir.join("missing.json")).is_err());
}

#[test]
fn repeated_indices_are_not_encoded() {
    let mut exporter = VideoExporter::default();
    let log = null_export(&mut exporter, NullMuxer::new());
    let frame = bgra(10, 8, [0, 0, 255, 255]);

    let got: Vec<Admission> = [0, 0, 1, 1, 1, 2]
        .into_iter()
        .map(|i| exporter.add_frame(&frame, i).unwrap())
        .collect();
    assert_eq!(
        got,
        vec![
            Admission::Accept { pts: 1 },
            Admission::Skip,
            Admission::Accept { pts: 2 },
            Admission::Skip,
            Admission::Skip,
            Admission::Accept { pts: 3 },
        ]
    );
    assert_eq!(packet_pts(&log), vec![1, 2, 3]);
    let header = log.lock().unwrap().header.clone().unwrap();
    assert_eq!((header.width, header.height), (8, 6));
    assert_eq!(header.pixel_format, PixelFormat::Rgb8);
    assert_eq!(header.gop_size, 0);

    exporter.commit_file().unwrap();
    assert!(log.lock().unwrap().trailer_written);
}

#[test]
fn odd_crop_size_is_floored_to_even() {
    let mut exporter = VideoExporter::default();
    let mux = NullMuxer::new();
    let log = mux.log();
    exporter
        .initialize_with_muxer(Box::new(mux), None, false, CropRect::new(0, 0, 9, 7))
        .unwrap();
    let cfg = exporter.stream_config().unwrap();
    assert_eq!((cfg.width, cfg.height), (8, 6));

    exporter.add_frame(&bgra(21, 13, [9, 9, 9, 255]), 0).unwrap();
    exporter.commit_file().unwrap();
    assert_eq!(log.lock().unwrap().packets.len(), 1);
}

#[test]
fn second_cycle_reproduces_the_first() {
    let mut exporter = VideoExporter::default();
    let frame = bgra(8, 6, [255, 0, 0, 255]);
    let mut cycles = Vec::new();
    for _ in 0..2 {
        let log = null_export(&mut exporter, NullMuxer::new());
        for i in [0, 1, 1, 2, 5] {
            exporter.add_frame(&frame, i).unwrap();
        }
        exporter.commit_file().unwrap();
        assert_eq!(exporter.sequencer().last_pts(), 0);
        cycles.push(packet_pts(&log));
    }
    assert_eq!(cycles[0], vec![1, 2, 3, 4]);
    assert_eq!(cycles[0], cycles[1]);
}

#[test]
fn zero_frame_commit_writes_header_and_trailer() {
    let mut exporter = VideoExporter::default();
    let log = null_export(&mut exporter, NullMuxer::new());
    exporter.commit_file().unwrap();

    let log = log.lock().unwrap();
    assert!(log.header.is_some());
    assert!(log.packets.is_empty());
    assert!(log.trailer_written);
}

#[test]
fn lifecycle_order_is_enforced() {
    let mut exporter = VideoExporter::default();
    let frame = bgra(8, 6, [0, 0, 0, 255]);
    assert!(matches!(
        exporter.add_frame(&frame, 0),
        Err(ExportError::State(_))
    ));
    assert!(matches!(exporter.commit_file(), Err(ExportError::State(_))));

    null_export(&mut exporter, NullMuxer::new());
    assert!(matches!(
        exporter.initialize_with_muxer(Box::new(NullMuxer::new()), None, true, RECT),
        Err(ExportError::State(_))
    ));
    exporter.commit_file().unwrap();
    assert!(matches!(exporter.commit_file(), Err(ExportError::State(_))));
}

#[test]
fn decreasing_index_is_rejected_but_export_continues() {
    let mut exporter = VideoExporter::default();
    let log = null_export(&mut exporter, NullMuxer::new());
    let frame = bgra(8, 6, [0, 0, 0, 255]);

    exporter.add_frame(&frame, 3).unwrap();
    assert!(matches!(
        exporter.add_frame(&frame, 2),
        Err(ExportError::Sequence(_))
    ));
    assert!(exporter.is_active());
    assert_eq!(
        exporter.add_frame(&frame, 4).unwrap(),
        Admission::Accept { pts: 2 }
    );
    exporter.commit_file().unwrap();
    assert_eq!(packet_pts(&log), vec![1, 2]);
}

#[test]
fn crop_outside_the_image_exports_a_black_frame() {
    let mut exporter = VideoExporter::default();
    let mux = NullMuxer::new();
    let log = mux.log();
    exporter
        .initialize_with_muxer(Box::new(mux), None, true, CropRect::new(100, 100, 8, 6))
        .unwrap();

    assert_eq!(
        exporter.add_frame(&bgra(8, 6, [255, 255, 255, 255]), 0).unwrap(),
        Admission::Accept { pts: 1 }
    );
    assert!(exporter.is_active());
    exporter.commit_file().unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.packets.len(), 1);
    assert!(!log.aborted);
}

#[test]
fn unsupported_frame_format_fails_the_export() {
    let mut exporter = VideoExporter::default();
    let mux = NullMuxer::new();
    let log = mux.log();
    exporter
        .initialize_with_muxer(Box::new(mux), None, false, RECT)
        .unwrap();
    let rgb8 = PixelBuffer::new(8, 6, PixelFormat::Rgb8).unwrap();

    assert!(matches!(
        exporter.add_frame(&rgb8, 0),
        Err(ExportError::ConversionContext(_))
    ));
    assert!(!exporter.is_active());
    assert!(log.lock().unwrap().aborted);
    assert!(matches!(
        exporter.add_frame(&bgra(8, 6, [0, 0, 0, 255]), 1),
        Err(ExportError::State(_))
    ));
}

#[test]
fn configured_crop_drives_the_picture_size() {
    let opts = ExportOpts {
        crop: Some(CropRect::new(2, 2, 12, 10)),
        ..ExportOpts::default()
    };
    assert_eq!(opts.crop_rect(), CropRect::new(2, 2, 12, 10));
    assert_eq!(ExportOpts::default().crop_rect(), ExportOpts::DEFAULT_CROP);

    let mut exporter = VideoExporter::new(opts);
    let mux = NullMuxer::new();
    let log = mux.log();
    exporter
        .initialize_from_opts_with_muxer(Box::new(mux), None, true)
        .unwrap();
    let cfg = exporter.stream_config().unwrap();
    assert_eq!((cfg.width, cfg.height), (12, 10));

    exporter.add_frame(&bgra(20, 20, [0, 255, 0, 255]), 0).unwrap();
    exporter.commit_file().unwrap();
    assert_eq!(log.lock().unwrap().packets[0].size, 12 * 10);
}

#[test]
fn frame_buffers_do_not_outlive_add_frame() {
    let mut exporter = VideoExporter::default();
    null_export(&mut exporter, NullMuxer::failing_after(1));
    let frame = bgra(16, 12, [10, 20, 30, 255]);
    let live = PixelBuffer::live_count();

    exporter.add_frame(&frame, 0).unwrap();
    assert_eq!(PixelBuffer::live_count(), live);
    exporter.add_frame(&frame, 0).unwrap();
    assert_eq!(PixelBuffer::live_count(), live);
    assert!(matches!(
        exporter.add_frame(&frame, 1),
        Err(ExportError::Encode(_))
    ));
    assert_eq!(PixelBuffer::live_count(), live);
}
