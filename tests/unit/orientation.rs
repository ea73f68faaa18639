use super::*;

const NATURAL: PixelSize = PixelSize {
    width: 1920,
    height: 1080,
};

fn corners(size: PixelSize) -> [Point; 4] {
    let w = f64::from(size.width);
    let h = f64::from(size.height);
    [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(0.0, h),
        Point::new(w, h),
    ]
}

fn assert_maps_onto_render_rect(info: &OrientationInfo) {
    let rw = f64::from(info.render_size.width);
    let rh = f64::from(info.render_size.height);
    let mapped: Vec<Point> = corners(info.natural_size)
        .iter()
        .map(|&p| info.present(p))
        .collect();
    let min_x = mapped.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = mapped.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = mapped.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = mapped.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    assert!(min_x.abs() < 1e-9 && min_y.abs() < 1e-9, "{mapped:?}");
    assert!((max_x - rw).abs() < 1e-9 && (max_y - rh).abs() < 1e-9, "{mapped:?}");
}

#[test]
fn canonical_cases_resolve_sizes_and_portrait_flag() {
    let cases = [
        (Affine::IDENTITY, Orientation::Up, NATURAL, false),
        (
            Affine::new([-1.0, 0.0, 0.0, -1.0, 1920.0, 1080.0]),
            Orientation::Down,
            NATURAL,
            false,
        ),
        (
            Affine::new([0.0, 1.0, -1.0, 0.0, 1080.0, 0.0]),
            Orientation::Right,
            NATURAL.swapped(),
            true,
        ),
        (
            Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, 1920.0]),
            Orientation::Left,
            NATURAL.swapped(),
            true,
        ),
    ];
    for (t, want, size, portrait) in cases {
        let info = OrientationInfo::resolve(t, NATURAL);
        assert_eq!(info.orientation, want);
        assert_eq!(info.render_size, size);
        assert_eq!(info.is_portrait, portrait);
        assert_maps_onto_render_rect(&info);
    }
}

#[test]
fn upright_keeps_preferred_transform() {
    let info = OrientationInfo::resolve(Affine::IDENTITY, NATURAL);
    assert_eq!(info.presentation_transform, Affine::IDENTITY);
}

#[test]
fn right_rotation_puts_top_left_at_top_right() {
    let info = OrientationInfo::resolve(Affine::new([0.0, 1.0, -1.0, 0.0, 0.0, 0.0]), NATURAL);
    let p = info.present(Point::new(0.0, 0.0));
    assert_eq!(p, Point::new(1080.0, 0.0));
    let back = info.render_to_natural() * p;
    assert!((back.x).abs() < 1e-9 && (back.y).abs() < 1e-9);
}

#[test]
fn arbitrary_rotation_degrades_to_upright() {
    let t = Affine::rotate(0.3);
    let info = OrientationInfo::resolve(t, NATURAL);
    assert_eq!(info.orientation, Orientation::Unsupported);
    assert_eq!(info.render_size, NATURAL);
    assert!(!info.is_portrait);
    assert_eq!(info.presentation_transform, Affine::IDENTITY);
}

#[test]
fn near_canonical_coefficients_are_accepted() {
    let t = Affine::new([1e-9, 1.0 - 1e-9, -1.0, 0.0, 0.0, 0.0]);
    assert_eq!(Orientation::classify(t), Orientation::Right);
}

#[test]
fn rotation_angles_map_to_transforms() {
    let small = PixelSize::new(64, 32);
    for (deg, want) in [
        (0, Orientation::Up),
        (90, Orientation::Right),
        (-270, Orientation::Right),
        (180, Orientation::Down),
        (270, Orientation::Left),
        (-90, Orientation::Left),
    ] {
        let t = Orientation::preferred_transform_for_rotation(deg, small);
        assert_eq!(Orientation::classify(t), want, "deg={deg}");
    }
}
