use super::*;

#[test]
fn fps_validation() {
    assert!(Fps::new(30, 1).is_ok());
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert_eq!(Fps::default(), Fps { num: 30, den: 1 });
}

#[test]
fn pixel_size_swap_and_len() {
    let s = PixelSize::new(1920, 1080);
    assert_eq!(s.swapped(), PixelSize::new(1080, 1920));
    assert_eq!(s.rgba_len(), 1920 * 1080 * 4);
    assert!(PixelSize::new(0, 4).is_empty());
}

#[test]
fn hex_colors_parse() {
    assert_eq!(Rgba8::from_hex("#ff8000").unwrap(), Rgba8::new(255, 128, 0, 255));
    assert_eq!(Rgba8::from_hex("00000080").unwrap(), Rgba8::new(0, 0, 0, 128));
    assert!(Rgba8::from_hex("#fff").is_err());
    assert!(Rgba8::from_hex("#gg0000").is_err());
}
