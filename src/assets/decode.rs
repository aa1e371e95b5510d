use std::sync::Arc;

use anyhow::Context;

use crate::foundation::core::Size;
use crate::foundation::error::{CuecastError, CuecastResult};

#[derive(Clone, Debug)]
/// Prepared raster image in premultiplied RGBA8 form.
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

#[derive(Clone, Debug)]
/// Prepared SVG sprite represented as a parsed `usvg` tree.
pub struct PreparedSvg {
    /// Parsed SVG tree.
    pub tree: Arc<usvg::Tree>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Container format of an audio cue, detected from its leading bytes.
pub enum AudioFormat {
    Wav,
    Ogg,
    Mp3,
    Flac,
}

#[derive(Clone, Debug)]
/// Audio cue kept in its encoded container; the [`AudioSink`](crate::AudioSink) decodes on play.
pub struct PreparedAudio {
    /// Detected container format.
    pub format: AudioFormat,
    /// Encoded bytes.
    pub bytes: Arc<Vec<u8>>,
}

#[derive(Clone, Debug)]
/// Union of all prepared resource kinds held by the cache.
pub enum PreparedAsset {
    /// Raster sprite.
    Image(PreparedImage),
    /// Vector sprite.
    Svg(PreparedSvg),
    /// Audio cue.
    Audio(PreparedAudio),
}

impl PreparedAsset {
    /// Intrinsic size when this asset can be shown as a sprite.
    pub fn sprite_size(&self) -> Option<Size> {
        match self {
            Self::Image(img) => Some(Size::new(f64::from(img.width), f64::from(img.height))),
            Self::Svg(svg) => {
                let s = svg.tree.size();
                Some(Size::new(f64::from(s.width()), f64::from(s.height())))
            }
            Self::Audio(_) => None,
        }
    }

    pub fn as_audio(&self) -> Option<&PreparedAudio> {
        match self {
            Self::Audio(a) => Some(a),
            _ => None,
        }
    }

    /// Approximate resident size, reported by diagnostics.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Image(img) => img.rgba8_premul.len(),
            Self::Svg(_) => 0,
            Self::Audio(a) => a.bytes.len(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// What a locator is expected to decode into.
pub enum AssetKind {
    Image,
    Svg,
    Audio,
}

impl AssetKind {
    /// Infer the kind from a locator's file extension.
    pub fn from_locator(locator: &str) -> Option<Self> {
        let path = locator.split(['?', '#']).next().unwrap_or(locator);
        let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" => Some(Self::Image),
            "svg" => Some(Self::Svg),
            "wav" | "ogg" | "oga" | "mp3" | "flac" => Some(Self::Audio),
            _ => None,
        }
    }
}

/// Decode fetched bytes into the representation playback consumes.
pub fn decode_asset(kind: AssetKind, bytes: &[u8]) -> CuecastResult<PreparedAsset> {
    match kind {
        AssetKind::Image => decode_image(bytes).map(PreparedAsset::Image),
        AssetKind::Svg => parse_svg(bytes).map(PreparedAsset::Svg),
        AssetKind::Audio => sniff_audio(bytes).map(PreparedAsset::Audio),
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> CuecastResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Parse SVG bytes into a prepared `usvg` tree.
pub fn parse_svg(bytes: &[u8]) -> CuecastResult<PreparedSvg> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
    Ok(PreparedSvg {
        tree: Arc::new(tree),
    })
}

/// Validate an audio container by its magic bytes.
pub fn sniff_audio(bytes: &[u8]) -> CuecastResult<PreparedAudio> {
    let format = if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        AudioFormat::Wav
    } else if bytes.starts_with(b"OggS") {
        AudioFormat::Ogg
    } else if bytes.starts_with(b"fLaC") {
        AudioFormat::Flac
    } else if bytes.starts_with(b"ID3") || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0)
    {
        AudioFormat::Mp3
    } else {
        return Err(CuecastError::validation("unrecognized audio container"));
    };

    Ok(PreparedAudio {
        format,
        bytes: Arc::new(bytes.to_vec()),
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
