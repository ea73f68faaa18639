use super::*;
use crate::foundation::core::{Affine, PixelSize};
use crate::orientation::Orientation;

/// 3x2 frame whose red channel encodes the pixel index.
fn indexed() -> FrameRGBA {
    let mut data = Vec::new();
    for i in 0..6u8 {
        data.extend_from_slice(&[i, 0, 0, 255]);
    }
    FrameRGBA::from_raw(PixelSize::new(3, 2), data, false).unwrap()
}

fn reds(f: &FrameRGBA) -> Vec<u8> {
    f.data.chunks_exact(4).map(|p| p[0]).collect()
}

#[test]
fn upright_identity_passes_through() {
    let info = OrientationInfo::resolve(Affine::IDENTITY, PixelSize::new(3, 2));
    let out = orient_frame(indexed(), &info).unwrap();
    assert_eq!(reds(&out), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn right_rotation_turns_clockwise() {
    let natural = PixelSize::new(3, 2);
    let t = Orientation::preferred_transform_for_rotation(90, natural);
    let info = OrientationInfo::resolve(t, natural);
    let out = orient_frame(indexed(), &info).unwrap();
    assert_eq!(out.size(), PixelSize::new(2, 3));
    // natural rows: [0 1 2] / [3 4 5]; clockwise: [3 0] / [4 1] / [5 2]
    assert_eq!(reds(&out), vec![3, 0, 4, 1, 5, 2]);
}

#[test]
fn left_rotation_turns_counter_clockwise() {
    let natural = PixelSize::new(3, 2);
    let t = Orientation::preferred_transform_for_rotation(270, natural);
    let info = OrientationInfo::resolve(t, natural);
    let out = orient_frame(indexed(), &info).unwrap();
    assert_eq!(reds(&out), vec![2, 5, 1, 4, 0, 3]);
}

#[test]
fn upside_down_flips_both_axes() {
    let natural = PixelSize::new(3, 2);
    let t = Orientation::preferred_transform_for_rotation(180, natural);
    let info = OrientationInfo::resolve(t, natural);
    let out = orient_frame(indexed(), &info).unwrap();
    assert_eq!(reds(&out), vec![5, 4, 3, 2, 1, 0]);
}

#[test]
fn size_mismatch_is_rejected() {
    let info = OrientationInfo::resolve(Affine::IDENTITY, PixelSize::new(4, 4));
    assert!(orient_frame(indexed(), &info).is_err());
}
