use std::sync::Arc;

use chrono::NaiveDate;

use super::*;
use crate::assets::media::MediaAsset;
use crate::effects::filter::FilterSpec;
use crate::foundation::core::{Affine, PixelSize, Point, Size};
use crate::orientation::OrientationInfo;
use crate::overlay::element::{OverlayElement, OverlayId, OverlayPlacement, TextOverlay};
use crate::plan::{EditIntent, build_plan};
use crate::time::{RationalTime, SpeedFactor, TimeRange};

fn stamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(14, 5, 7)
        .unwrap()
}

fn plan(intent: EditIntent) -> CompositionPlan {
    let asset = Arc::new(MediaAsset {
        path: "/tmp/framecut_naming_source.mp4".into(),
        duration: RationalTime::from_secs(10),
        video_natural_size: PixelSize::new(640, 360),
        preferred_transform: Affine::IDENTITY,
        has_audio: true,
        nominal_fps: None,
    });
    let orientation = OrientationInfo::resolve(asset.preferred_transform, asset.video_natural_size);
    build_plan(asset, orientation, &intent).unwrap()
}

fn placement() -> OverlayPlacement {
    OverlayPlacement::new(
        Point::new(50.0, 50.0),
        Size::new(20.0, 10.0),
        Size::new(100.0, 100.0),
    )
}

fn caption() -> OverlayElement {
    OverlayElement::text(
        OverlayId(1),
        TextOverlay {
            text: "hi".into(),
            color: Default::default(),
            font_path: None,
            font_size: 12.0,
        },
        placement(),
    )
}

#[test]
fn single_edit_plans_get_their_screen_prefix() {
    let trimmed = plan(EditIntent {
        trim: Some(TimeRange::from_secs_f64(1.0, 4.0, 600).unwrap()),
        ..EditIntent::default()
    });
    assert_eq!(OutputKind::for_plan(&trimmed), OutputKind::Trimmed);

    let filtered = plan(EditIntent {
        filter: Some(FilterSpec::named("Dot Matrix")),
        ..EditIntent::default()
    });
    assert_eq!(
        OutputKind::for_plan(&filtered),
        OutputKind::Filtered("Dot Matrix".into())
    );

    let text = plan(EditIntent {
        overlays: vec![caption()],
        ..EditIntent::default()
    });
    assert_eq!(OutputKind::for_plan(&text), OutputKind::Text);

    let sticker = plan(EditIntent {
        overlays: vec![OverlayElement::sticker(OverlayId(2), "/tmp/s.png", placement())],
        ..EditIntent::default()
    });
    assert_eq!(OutputKind::for_plan(&sticker), OutputKind::Sticker);
}

#[test]
fn mixed_or_retimed_plans_are_edited() {
    let sped = plan(EditIntent {
        speed: SpeedFactor::new(1.5).unwrap(),
        ..EditIntent::default()
    });
    assert_eq!(OutputKind::for_plan(&sped), OutputKind::Edited);

    let mixed = plan(EditIntent {
        trim: Some(TimeRange::from_secs_f64(1.0, 4.0, 600).unwrap()),
        overlays: vec![caption()],
        ..EditIntent::default()
    });
    assert_eq!(OutputKind::for_plan(&mixed), OutputKind::Edited);

    assert_eq!(OutputKind::for_plan(&plan(EditIntent::default())), OutputKind::Edited);
}

#[test]
fn names_follow_the_timestamp_layout() {
    let dir = std::env::temp_dir().join("framecut_naming_layout");
    let _ = std::fs::remove_dir_all(&dir);
    let p = output_path(&dir, &OutputKind::Filtered("Dot Matrix".into()), stamp());
    assert_eq!(
        p.file_name().unwrap().to_str().unwrap(),
        "Filtered_Dot_Matrix_20240309_140507.mp4"
    );
    let p = output_path(&dir, &OutputKind::Trimmed, stamp());
    assert_eq!(
        p.file_name().unwrap().to_str().unwrap(),
        "TrimmedVideo_20240309_140507.mp4"
    );
}

#[test]
fn collisions_get_a_numeric_suffix() {
    let dir = std::env::temp_dir().join("framecut_naming_collision");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let first = output_path(&dir, &OutputKind::Text, stamp());
    std::fs::write(&first, b"x").unwrap();
    let second = output_path(&dir, &OutputKind::Text, stamp());
    assert_eq!(
        second.file_name().unwrap().to_str().unwrap(),
        "TextVideo_20240309_140507_2.mp4"
    );
    std::fs::write(&second, b"x").unwrap();
    let third = output_path(&dir, &OutputKind::Text, stamp());
    assert!(third.to_str().unwrap().ends_with("_3.mp4"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn free_path_keeps_the_extension() {
    let dir = std::env::temp_dir().join("framecut_naming_free");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let wanted = dir.join("clip.final.mp4");
    assert_eq!(free_path(&wanted), wanted);
    std::fs::write(&wanted, b"x").unwrap();
    assert_eq!(free_path(&wanted), dir.join("clip.final_2.mp4"));

    let _ = std::fs::remove_dir_all(&dir);
}
