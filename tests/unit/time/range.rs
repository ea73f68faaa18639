use super::*;
use crate::time::rational::DEFAULT_TIMESCALE;

fn secs(s: i64) -> RationalTime {
    RationalTime::from_secs(s)
}

fn asset(d: i64) -> TimeRange {
    TimeRange::from_zero(secs(d)).unwrap()
}

#[test]
fn negative_duration_is_rejected() {
    let err = TimeRange::new(secs(0), secs(-1)).unwrap_err();
    assert!(matches!(err, FramecutError::InvalidRange(_)));
}

#[test]
fn scale_divides_duration_and_keeps_start() {
    let r = TimeRange::new(secs(2), secs(6)).unwrap();
    let s = r.scale(SpeedFactor::new(2.0).unwrap());
    assert_eq!(s.start, secs(2));
    assert_eq!(s.duration, secs(3));

    let slow = r.scale(SpeedFactor::new(0.5).unwrap());
    assert_eq!(slow.duration, secs(12));
}

#[test]
fn speed_round_trip_is_within_one_tick() {
    let d = RationalTime::new(6_007, DEFAULT_TIMESCALE).unwrap();
    let full = TimeRange::from_zero(d).unwrap();
    for f in [0.5, 1.0, 1.5, 2.0, 3.0, 0.3333, 1.0 / 3.0, 0.1, 1e-5, 4.0, 0.25, 1.7] {
        let speed = SpeedFactor::new(f).unwrap();
        let scaled = full.scale(speed);

        let expected = d.as_secs_f64() / f;
        let got = scaled.duration.rescale(DEFAULT_TIMESCALE).unwrap();
        let tick = 1.0 / DEFAULT_TIMESCALE as f64;
        assert!(
            (got.as_secs_f64() - expected).abs() <= tick,
            "f={f}: got {} expected {expected}",
            got.as_secs_f64()
        );

        let back = scaled.scale(speed.inverse());
        assert_eq!(back.duration, d, "f={f}");
    }
}

#[test]
fn third_speed_is_exact_on_long_clips() {
    let third = SpeedFactor::new(1.0 / 3.0).unwrap();
    assert_eq!(asset(10).scale(third).duration, secs(30));

    let long = asset(600).scale(third);
    assert_eq!(long.duration, secs(1800));
    assert_eq!(long.scale(third.inverse()).duration, secs(600));
}

#[test]
fn clamp_accepts_full_range_unchanged() {
    let a = asset(10);
    assert_eq!(a.clamp(a).unwrap(), a);
}

#[test]
fn clamp_rejects_bad_trims() {
    let a = asset(10);
    let negative = TimeRange::new(secs(-1), secs(2)).unwrap();
    let empty = TimeRange::new(secs(1), secs(0)).unwrap();
    let overrun = TimeRange::new(secs(8), secs(3)).unwrap();
    for r in [negative, empty, overrun] {
        assert!(matches!(r.clamp(a), Err(FramecutError::InvalidRange(_))));
    }
}

#[test]
fn ui_minimum_is_one_second() {
    let short = TimeRange::new(secs(0), RationalTime::new(599, 600).unwrap()).unwrap();
    assert!(!short.meets_ui_minimum());
    assert!(TimeRange::new(secs(0), secs(1)).unwrap().meets_ui_minimum());
}

#[test]
fn snap_rounds_to_nearest_tick_without_passing_limit() {
    // 2.0004 s .. 7.9996 s on a 600 timescale snaps to 2 s .. 8 s.
    let r = TimeRange::from_secs_f64(2.0004, 7.9996, 100_000).unwrap();
    let snapped = r.snap_to_timescale(600, secs(10)).unwrap();
    assert_eq!(snapped.start, secs(2));
    assert_eq!(snapped.end(), secs(8));

    // End at 9.9995 s with a limit of 9.9990 s must not round up to 10 s.
    let limit = RationalTime::new(99_990, 10_000).unwrap();
    let near_end = TimeRange::from_secs_f64(9.0, 9.9995, 10_000).unwrap();
    let snapped = near_end.snap_to_timescale(600, limit).unwrap();
    assert!(snapped.end() <= limit);
    assert_eq!(snapped.end().rescale(600).unwrap().value(), 5999);
}

#[test]
fn speed_factor_validation_and_presets() {
    assert!(SpeedFactor::new(0.0).is_err());
    assert!(SpeedFactor::new(-2.0).is_err());
    assert!(SpeedFactor::new(f64::NAN).is_err());
    assert_eq!(SpeedFactor::new(1.5).unwrap().ratio(), (3, 2));
    assert_eq!(SpeedFactor::presets().len(), SpeedFactor::PRESETS.len());
    assert!(SpeedFactor::default().is_normal());
}
