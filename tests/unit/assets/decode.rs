use std::io::Cursor;

use super::*;

fn png_1x1(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(1, 1, rgba.to_vec()).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let prepared = decode_image(&png_1x1([100, 50, 200, 128])).unwrap();
    assert_eq!(prepared.width, 1);
    assert_eq!(prepared.height, 1);
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_image_rejects_garbage() {
    assert!(decode_image(b"definitely not a png").is_err());
}

#[test]
fn decode_svg_parse_ok_and_err() {
    let ok = br#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20"></svg>"#;
    let asset = decode_asset(AssetKind::Svg, ok).unwrap();
    let size = asset.sprite_size().unwrap();
    assert_eq!((size.width, size.height), (40.0, 20.0));

    let bad = br#"<svg"#;
    assert!(parse_svg(bad).is_err());
}

#[test]
fn audio_containers_are_sniffed() {
    let mut wav = b"RIFF".to_vec();
    wav.extend_from_slice(&[0, 0, 0, 0]);
    wav.extend_from_slice(b"WAVEfmt ");
    assert_eq!(sniff_audio(&wav).unwrap().format, AudioFormat::Wav);
    assert_eq!(sniff_audio(b"OggS\0\0").unwrap().format, AudioFormat::Ogg);
    assert_eq!(sniff_audio(b"ID3\x04").unwrap().format, AudioFormat::Mp3);
    assert_eq!(sniff_audio(&[0xFF, 0xFB, 0x90]).unwrap().format, AudioFormat::Mp3);
    assert_eq!(sniff_audio(b"fLaC").unwrap().format, AudioFormat::Flac);
    assert!(sniff_audio(b"").is_err());
    assert!(sniff_audio(b"<html>").is_err());
}

#[test]
fn audio_has_no_sprite_size() {
    let asset = decode_asset(AssetKind::Audio, b"OggS").unwrap();
    assert!(asset.sprite_size().is_none());
    assert!(asset.as_audio().is_some());
}

#[test]
fn kind_is_inferred_from_extension() {
    assert_eq!(AssetKind::from_locator("hero/triumph.PNG"), Some(AssetKind::Image));
    assert_eq!(AssetKind::from_locator("a.svg?v=3"), Some(AssetKind::Svg));
    assert_eq!(AssetKind::from_locator("sfx/cheer.ogg"), Some(AssetKind::Audio));
    assert_eq!(AssetKind::from_locator("noext"), None);
    assert_eq!(AssetKind::from_locator("x.txt"), None);
}
