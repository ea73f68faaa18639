use super::*;

fn placement(center: Point, size: Size, viewport: Size) -> OverlayPlacement {
    OverlayPlacement::new(center, size, viewport)
}

#[test]
fn aspect_fit_pillarboxes_and_letterboxes() {
    // 16:9 video in a square viewport: letterbox.
    let r = aspect_fit_rect(Size::new(1920.0, 1080.0), Size::new(400.0, 400.0));
    assert!((r.x0 - 0.0).abs() < 1e-9 && (r.width() - 400.0).abs() < 1e-9);
    assert!((r.height() - 225.0).abs() < 1e-9);
    assert!((r.y0 - 87.5).abs() < 1e-9);

    // 9:16 video in a landscape viewport: pillarbox.
    let r = aspect_fit_rect(Size::new(1080.0, 1920.0), Size::new(800.0, 450.0));
    assert!((r.height() - 450.0).abs() < 1e-9);
    assert!((r.width() - 253.125).abs() < 1e-9);
    assert!((r.center().x - 400.0).abs() < 1e-9);
}

#[test]
fn viewport_center_maps_to_render_center() {
    let viewports = [
        Size::new(390.0, 844.0),
        Size::new(844.0, 390.0),
        Size::new(500.0, 500.0),
        Size::new(1080.0, 1920.0),
    ];
    let renders = [
        PixelSize::new(1920, 1080),
        PixelSize::new(1080, 1920),
        PixelSize::new(640, 640),
        PixelSize::new(720, 1280),
    ];
    for vp in viewports {
        for rs in renders {
            for portrait in [false, true] {
                for conv in [VerticalConvention::TopDown, VerticalConvention::FlipWhenPortrait] {
                    let p = placement(
                        Point::new(vp.width / 2.0, vp.height / 2.0),
                        Size::new(100.0, 40.0),
                        vp,
                    );
                    let m = map_overlay(&p, rs, portrait, conv).unwrap();
                    let c = m.pixel_rect.center();
                    assert!((c.x - f64::from(rs.width) / 2.0).abs() <= 1.0, "{vp:?} {rs:?}");
                    assert!((c.y - f64::from(rs.height) / 2.0).abs() <= 1.0, "{vp:?} {rs:?}");
                }
            }
        }
    }
}

#[test]
fn video_rect_edges_map_to_render_edges() {
    // 16:9 render in a 400x400 viewport; video rect spans y in [87.5, 312.5].
    let vp = Size::new(400.0, 400.0);
    let rs = PixelSize::new(1920, 1080);
    let top_left = placement(Point::new(0.0, 87.5), Size::new(10.0, 10.0), vp);
    let m = map_overlay(&top_left, rs, false, VerticalConvention::TopDown).unwrap();
    let c = m.pixel_rect.center();
    assert!(c.x.abs() <= 1.0 && c.y.abs() <= 1.0, "{c:?}");

    let bottom_right = placement(Point::new(400.0, 312.5), Size::new(10.0, 10.0), vp);
    let m = map_overlay(&bottom_right, rs, false, VerticalConvention::TopDown).unwrap();
    let c = m.pixel_rect.center();
    assert!((c.x - 1920.0).abs() <= 1.0 && (c.y - 1080.0).abs() <= 1.0, "{c:?}");
}

#[test]
fn size_scales_by_render_to_rect_ratio() {
    let vp = Size::new(400.0, 400.0);
    let rs = PixelSize::new(1920, 1080);
    let p = placement(Point::new(200.0, 200.0), Size::new(100.0, 50.0), vp);
    let m = map_overlay(&p, rs, false, VerticalConvention::TopDown).unwrap();
    // rect is 400x225 -> scale 4.8
    assert!((m.content_scale - 4.8).abs() < 1e-9);
    assert!((m.pixel_rect.width() - 480.0).abs() < 1e-9);
    assert!((m.pixel_rect.height() - 240.0).abs() < 1e-9);
}

#[test]
fn top_down_never_flips_and_legacy_flips_portrait_only() {
    let vp = Size::new(360.0, 640.0);
    let rs = PixelSize::new(1080, 1920);
    // A quarter of the way down the (full-height) video rect.
    let p = placement(Point::new(180.0, 160.0), Size::new(20.0, 20.0), vp);

    let td = map_overlay(&p, rs, true, VerticalConvention::TopDown).unwrap();
    assert!((td.pixel_rect.center().y - 480.0).abs() < 1e-9);

    let legacy_portrait = map_overlay(&p, rs, true, VerticalConvention::FlipWhenPortrait).unwrap();
    assert!((legacy_portrait.pixel_rect.center().y - 1440.0).abs() < 1e-9);

    let legacy_landscape =
        map_overlay(&p, rs, false, VerticalConvention::FlipWhenPortrait).unwrap();
    assert!((legacy_landscape.pixel_rect.center().y - 480.0).abs() < 1e-9);
}

#[test]
fn rotation_and_scale_pass_through() {
    let vp = Size::new(400.0, 400.0);
    let t = Affine::rotate(0.5) * Affine::scale(2.0);
    let p = OverlayPlacement::from_view_transform(
        Point::new(200.0, 200.0),
        Size::new(50.0, 50.0),
        t,
        vp,
    );
    assert!((p.rotation - 0.5).abs() < 1e-9);
    assert!((p.scale_x - 2.0).abs() < 1e-9 && (p.scale_y - 2.0).abs() < 1e-9);

    let m = map_overlay(&p, PixelSize::new(800, 800), false, VerticalConvention::TopDown).unwrap();
    assert!((m.rotation - 0.5).abs() < 1e-9);
    assert!((m.scale_x - 2.0).abs() < 1e-9);

    // The content transform keeps the rect center fixed.
    let local_center = Point::new(m.pixel_rect.width() / 2.0, m.pixel_rect.height() / 2.0);
    let c = m.content_transform() * local_center;
    assert!((c.x - 400.0).abs() < 1e-9 && (c.y - 400.0).abs() < 1e-9);
}

#[test]
fn degenerate_inputs_are_rejected() {
    let p = placement(Point::new(1.0, 1.0), Size::new(10.0, 10.0), Size::new(0.0, 100.0));
    assert!(map_overlay(&p, PixelSize::new(10, 10), false, VerticalConvention::TopDown).is_err());
    let p = placement(Point::new(1.0, 1.0), Size::new(10.0, 10.0), Size::new(10.0, 10.0));
    assert!(map_overlay(&p, PixelSize::new(0, 10), false, VerticalConvention::TopDown).is_err());
}
