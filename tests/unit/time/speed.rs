use super::*;

#[test]
fn presets_reduce_to_small_ratios() {
    let ratios: Vec<_> = SpeedFactor::presets().iter().map(|s| s.ratio()).collect();
    assert_eq!(ratios, vec![(1, 2), (1, 1), (3, 2), (2, 1), (3, 1), (4, 1)]);
    assert!(SpeedFactor::presets()[1].is_normal());
}

#[test]
fn from_ratio_matches_new() {
    let a = SpeedFactor::from_ratio(6, 4).unwrap();
    assert_eq!(a, SpeedFactor::new(1.5).unwrap());
    assert!(SpeedFactor::from_ratio(0, 1).is_err());
    assert!(SpeedFactor::from_ratio(1, -2).is_err());
}

#[test]
fn inverse_swaps_the_ratio() {
    let s = SpeedFactor::new(0.25).unwrap();
    assert_eq!(s.inverse().ratio(), (4, 1));
    assert_eq!(s.inverse().get(), 4.0);
}

#[test]
fn ratio_is_the_closest_small_fraction() {
    assert_eq!(SpeedFactor::new(1.0 / 3.0).unwrap().ratio(), (1, 3));
    assert_eq!(SpeedFactor::new(0.1).unwrap().ratio(), (1, 10));
    assert_eq!(SpeedFactor::new(1.7).unwrap().ratio(), (17, 10));
    let s = SpeedFactor::new(1.23456).unwrap();
    assert_eq!(s.ratio(), (3858, 3125));
    assert_eq!(s.get(), 1.23456);
}

#[test]
fn tiny_and_huge_factors_are_accepted() {
    assert_eq!(SpeedFactor::new(1e-5).unwrap().ratio(), (1, 100_000));
    assert_eq!(SpeedFactor::new(0.00004).unwrap().ratio(), (1, 25_000));
    assert_eq!(SpeedFactor::new(1e-300).unwrap().ratio(), (1, 1 << 40));
    assert_eq!(SpeedFactor::new(1e300).unwrap().ratio(), (1 << 40, 1));
    assert!(SpeedFactor::new(f64::NAN).is_err());
    assert!(SpeedFactor::new(f64::INFINITY).is_err());
    assert!(SpeedFactor::new(0.0).is_err());
}

#[test]
fn serializes_as_a_plain_number() {
    let s: SpeedFactor = serde_json::from_str("2.0").unwrap();
    assert_eq!(s.ratio(), (2, 1));
    assert_eq!(serde_json::to_string(&s).unwrap(), "2.0");
    assert!(serde_json::from_str::<SpeedFactor>("-1.0").is_err());
    assert_eq!(s.to_string(), "2x");
}
