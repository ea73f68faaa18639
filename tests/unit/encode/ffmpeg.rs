use super::*;
use crate::foundation::core::PixelSize;

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &[0, 0, 0, 0], [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_alpha_255_is_identity() {
    let src = vec![1u8, 2, 3, 255];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn odd_sizes_fail_as_session_create() {
    let dir = std::env::temp_dir().join(format!("framecut_sink_{}", std::process::id()));
    let mut sink = FfmpegSink::new(SinkOpts::new(dir.join("odd.mp4")));
    let err = sink
        .begin(SinkConfig {
            width: 641,
            height: 360,
            fps: Fps::default(),
            audio: None,
        })
        .unwrap_err();
    assert!(matches!(err, FramecutError::ExportSessionCreateFailed(_)));
}

#[test]
fn existing_output_without_overwrite_fails_to_begin() {
    let dir = std::env::temp_dir().join(format!("framecut_sink_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let out = dir.join("taken.mp4");
    std::fs::write(&out, b"x").unwrap();
    let mut sink = FfmpegSink::new(SinkOpts::new(&out));
    let err = sink
        .begin(SinkConfig {
            width: 64,
            height: 64,
            fps: Fps::default(),
            audio: None,
        })
        .unwrap_err();
    assert!(matches!(err, FramecutError::ExportSessionCreateFailed(_)));
}

#[test]
fn push_before_begin_is_an_error() {
    let mut sink = FfmpegSink::new(SinkOpts::new("unused.mp4"));
    let frame = FrameRGBA::solid(PixelSize::new(2, 2), [0, 0, 0, 255]);
    assert!(sink.push_frame(FrameIndex(0), &frame).is_err());
    sink.abort();
}
