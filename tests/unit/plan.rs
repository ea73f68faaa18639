use super::*;
use crate::foundation::core::{Affine, PixelSize, Point, Size};
use crate::overlay::element::{OverlayId, OverlayPlacement};
use crate::time::RationalTime;

fn asset(secs: i64, video: bool, audio: bool) -> Arc<MediaAsset> {
    Arc::new(MediaAsset {
        path: "/tmp/framecut_plan_source.mp4".into(),
        duration: RationalTime::from_secs(secs),
        video_natural_size: if video {
            PixelSize::new(640, 360)
        } else {
            PixelSize::new(0, 0)
        },
        preferred_transform: Affine::IDENTITY,
        has_audio: audio,
        nominal_fps: None,
    })
}

fn orient(a: &MediaAsset) -> OrientationInfo {
    OrientationInfo::resolve(a.preferred_transform, a.video_natural_size)
}

#[test]
fn defaults_keep_the_whole_asset() {
    let a = asset(10, true, true);
    let plan = build_plan(Arc::clone(&a), orient(&a), &EditIntent::default()).unwrap();
    assert_eq!(plan.trim, a.full_range());
    assert!(!plan.is_trimmed());
    assert_eq!(plan.output_range().duration, RationalTime::from_secs(10));
    assert!(plan.resolved_filter().unwrap().is_none());
}

#[test]
fn trim_is_validated_and_snapped() {
    let a = asset(10, true, false);
    let intent = EditIntent {
        trim: Some(TimeRange::from_secs_f64(2.0001, 8.0, 100_000).unwrap()),
        speed: SpeedFactor::new(2.0).unwrap(),
        ..EditIntent::default()
    };
    let plan = build_plan(Arc::clone(&a), orient(&a), &intent).unwrap();
    assert_eq!(plan.trim.start, RationalTime::from_secs(2));
    assert_eq!(plan.output_range().duration, RationalTime::from_secs(3));
    assert!(plan.is_trimmed());

    let bad = EditIntent {
        trim: Some(TimeRange::from_secs_f64(9.0, 12.0, 600).unwrap()),
        ..EditIntent::default()
    };
    assert!(matches!(
        build_plan(Arc::clone(&a), orient(&a), &bad).unwrap_err(),
        FramecutError::InvalidRange(_)
    ));
}

#[test]
fn unknown_filter_fails_before_export() {
    let a = asset(5, true, false);
    let intent = EditIntent {
        filter: Some(FilterSpec::named("Sparkle")),
        ..EditIntent::default()
    };
    let err = build_plan(Arc::clone(&a), orient(&a), &intent).unwrap_err();
    assert!(matches!(err, FramecutError::UnknownFilter(_)));
}

#[test]
fn audio_only_source_is_missing_track() {
    let a = asset(5, false, true);
    let err = build_plan(Arc::clone(&a), orient(&a), &EditIntent::default()).unwrap_err();
    assert!(matches!(err, FramecutError::MissingTrack(_)));
}

#[test]
fn silent_replacement_is_missing_track() {
    let a = asset(5, true, true);
    let intent = EditIntent {
        audio: AudioSelection::Replacement {
            asset: asset(5, true, false),
            looped: true,
        },
        ..EditIntent::default()
    };
    let err = build_plan(Arc::clone(&a), orient(&a), &intent).unwrap_err();
    assert!(matches!(err, FramecutError::MissingTrack(_)));
}

#[test]
fn bad_overlay_placement_is_rejected() {
    let a = asset(5, true, false);
    let mut placement = OverlayPlacement::new(
        Point::new(10.0, 10.0),
        Size::new(0.0, 10.0),
        Size::new(100.0, 100.0),
    );
    placement.rotation = 0.3;
    let intent = EditIntent {
        overlays: vec![OverlayElement::sticker(OverlayId(1), "x.png", placement)],
        ..EditIntent::default()
    };
    assert!(matches!(
        build_plan(Arc::clone(&a), orient(&a), &intent).unwrap_err(),
        FramecutError::Validation(_)
    ));
}
