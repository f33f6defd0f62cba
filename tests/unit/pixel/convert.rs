use super::*;

fn key(src: PixelFormat, sw: u32, sh: u32, dst: PixelFormat, dw: u32, dh: u32) -> ConversionKey {
    ConversionKey {
        src_format: src,
        src_width: sw,
        src_height: sh,
        dst_format: dst,
        dst_width: dw,
        dst_height: dh,
    }
}

fn solid(format: PixelFormat, width: u32, height: u32, px: [u8; 4]) -> PixelBuffer {
    let data = px.repeat((width * height) as usize);
    PixelBuffer::from_packed(width, height, format, data).unwrap()
}

#[test]
fn unsupported_pairs_fail_with_conversion_context_error() {
    let direct = ColorConverter::new(key(PixelFormat::Bgra, 4, 4, PixelFormat::Rgb8, 4, 4));
    assert!(matches!(direct, Err(ExportError::ConversionContext(_))));

    let odd = ColorConverter::new(key(PixelFormat::Rgba, 5, 4, PixelFormat::Yuv420p, 5, 4));
    assert!(matches!(odd, Err(ExportError::ConversionContext(_))));

    let empty = ColorConverter::new(key(PixelFormat::Yuv420p, 0, 4, PixelFormat::Rgb8, 4, 4));
    assert!(matches!(empty, Err(ExportError::ConversionContext(_))));
}

#[test]
fn converter_rejects_mismatched_input() {
    let cvt = ColorConverter::new(key(PixelFormat::Rgba, 4, 4, PixelFormat::Yuv420p, 4, 4)).unwrap();
    let wrong = solid(PixelFormat::Bgra, 4, 4, [0, 0, 0, 255]);
    assert!(cvt.convert(&wrong).is_err());
}

#[test]
fn bt601_reference_values() {
    assert_eq!(rgb_to_y(0, 0, 0), 16);
    assert_eq!(rgb_to_y(255, 255, 255), 235);
    assert_eq!(rgb_to_uv(128, 128, 128), (128, 128));
    assert_eq!(yuv_to_rgb(16, 128, 128), [0, 0, 0]);
    assert_eq!(yuv_to_rgb(235, 128, 128), [255, 255, 255]);
}

#[test]
fn rgb8_quantization_matches_palette() {
    let palette = rgb8_palette();
    assert_eq!(palette.len(), 256 * 3);
    assert_eq!(rgb_to_rgb8(0, 0, 0), 0);
    assert_eq!(rgb_to_rgb8(255, 255, 255), 0xff);
    assert_eq!(rgb_to_rgb8(255, 0, 0), 0b1110_0000);
    assert_eq!(&palette[0xff * 3..0xff * 3 + 3], &[255, 255, 255]);
    assert_eq!(&palette[0b1110_0000 * 3..0b1110_0000 * 3 + 3], &[255, 0, 0]);

    // Every palette entry quantizes back to its own index.
    for i in 0..256usize {
        let p = &palette[i * 3..i * 3 + 3];
        assert_eq!(usize::from(rgb_to_rgb8(p[0], p[1], p[2])), i);
    }
}

#[test]
fn bgra_and_rgba_sources_agree() {
    let bgra = solid(PixelFormat::Bgra, 4, 2, [50, 100, 200, 255]);
    let rgba = solid(PixelFormat::Rgba, 4, 2, [200, 100, 50, 255]);
    let a = ColorConverter::new(key(PixelFormat::Bgra, 4, 2, PixelFormat::Yuv420p, 4, 2))
        .unwrap()
        .convert(&bgra)
        .unwrap();
    let b = ColorConverter::new(key(PixelFormat::Rgba, 4, 2, PixelFormat::Yuv420p, 4, 2))
        .unwrap()
        .convert(&rgba)
        .unwrap();
    assert_eq!(a.to_tight_bytes(), b.to_tight_bytes());
}

#[test]
fn yuv_round_trip_stays_close_to_source() {
    let src = solid(PixelFormat::Rgba, 8, 8, [200, 100, 50, 255]);
    let yuv = ColorConverter::new(key(PixelFormat::Rgba, 8, 8, PixelFormat::Yuv420p, 8, 8))
        .unwrap()
        .convert(&src)
        .unwrap();
    let back = ColorConverter::new(key(PixelFormat::Yuv420p, 8, 8, PixelFormat::Rgba, 8, 8))
        .unwrap()
        .convert(&yuv)
        .unwrap();
    for px in back.plane(0).chunks_exact(4) {
        assert!((i32::from(px[0]) - 200).abs() <= 3, "{px:?}");
        assert!((i32::from(px[1]) - 100).abs() <= 3, "{px:?}");
        assert!((i32::from(px[2]) - 50).abs() <= 3, "{px:?}");
        assert_eq!(px[3], 255);
    }
}

#[test]
fn scaling_stage_resizes_every_plane() {
    let src = solid(PixelFormat::Rgba, 8, 8, [10, 20, 30, 255]);
    let yuv = ColorConverter::new(key(PixelFormat::Rgba, 8, 8, PixelFormat::Yuv420p, 8, 8))
        .unwrap()
        .convert(&src)
        .unwrap();
    let scaled = ColorConverter::new(key(PixelFormat::Yuv420p, 8, 8, PixelFormat::Yuv420p, 4, 6))
        .unwrap()
        .convert(&yuv)
        .unwrap();
    assert_eq!((scaled.width(), scaled.height()), (4, 6));
    assert_eq!(scaled.plane_size(1), (2, 3));
    let y0 = scaled.row(0, 0)[0];
    assert!(scaled.plane(0).iter().all(|&v| v == y0));
}
