use super::*;
use crate::orientation::Orientation;

fn instruction(natural: PixelSize, rotation: i32, filter: Option<FilterKind>) -> RenderInstruction {
    let t = Orientation::preferred_transform_for_rotation(rotation, natural);
    let orientation = OrientationInfo::resolve(t, natural);
    RenderInstruction {
        time_range: TimeRange::from_zero(crate::time::RationalTime::from_secs(1)).unwrap(),
        render_size: orientation.render_size,
        orientation,
        filter,
        overlays: Vec::new(),
    }
}

#[test]
fn processes_orient_then_filter() {
    let natural = PixelSize::new(4, 2);
    let proc = FrameProcessor::new(instruction(natural, 90, Some(FilterKind::XRay)), None).unwrap();
    let out = proc
        .process(FrameRGBA::solid(natural, [10, 20, 30, 255]))
        .unwrap();
    assert_eq!(out.size(), PixelSize::new(2, 4));
    assert_eq!(out.pixel(1, 3), [245, 235, 225, 255]);
}

#[test]
fn overlay_is_composited_after_the_filter() {
    let natural = PixelSize::new(2, 2);
    let mut layer = FrameRGBA::solid(natural, [0, 0, 0, 0]);
    layer.premultiplied = true;
    layer.data[0..4].copy_from_slice(&[255, 255, 255, 255]);

    let proc =
        FrameProcessor::new(instruction(natural, 0, Some(FilterKind::Mono)), Some(layer)).unwrap();
    let out = proc
        .process(FrameRGBA::solid(natural, [200, 0, 0, 255]))
        .unwrap();
    // overlay pixel stays white, untouched by the mono filter
    assert_eq!(out.pixel(0, 0), [255, 255, 255, 255]);
    let p = out.pixel(1, 1);
    assert_eq!(p[0], p[1]);
    assert_eq!(p[1], p[2]);
}

#[test]
fn mismatched_overlay_layer_is_rejected() {
    let natural = PixelSize::new(2, 2);
    let mut layer = FrameRGBA::solid(PixelSize::new(3, 3), [0, 0, 0, 0]);
    layer.premultiplied = true;
    assert!(FrameProcessor::new(instruction(natural, 0, None), Some(layer)).is_err());
}

#[test]
fn rotation_comes_from_the_resolved_orientation() {
    let natural = PixelSize::new(3, 2);
    let mut data = Vec::new();
    for i in 0..6u8 {
        data.extend_from_slice(&[i, 0, 0, 255]);
    }
    let frame = FrameRGBA::from_raw(natural, data, false).unwrap();
    let proc = FrameProcessor::new(instruction(natural, 90, None), None).unwrap();
    let out = proc.process(frame).unwrap();
    let reds: Vec<u8> = out.data.chunks_exact(4).map(|p| p[0]).collect();
    assert_eq!(reds, vec![3, 0, 4, 1, 5, 2]);
}
