// ============================================================================
// IMAGE + PARAMS I/O — encoding maps to disk, loading sources, params files
// ============================================================================

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{DynamicImage, ImageError, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::ops::displacement::GlassParams;

/// Raster output formats for generated maps and previews.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Tga,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
        }
    }

    /// Parse a format name as given on the command line.
    pub fn from_name(name: &str) -> Option<SaveFormat> {
        match name.to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpeg" | "jpg" => Some(SaveFormat::Jpeg),
            "bmp" => Some(SaveFormat::Bmp),
            "tga" => Some(SaveFormat::Tga),
            _ => None,
        }
    }

    /// Infer a format from a file extension, defaulting to PNG.
    pub fn from_extension(path: &Path) -> SaveFormat {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "jpg" | "jpeg" => SaveFormat::Jpeg,
            "bmp" => SaveFormat::Bmp,
            "tga" => SaveFormat::Tga,
            _ => SaveFormat::Png,
        }
    }
}

/// Encode and write an image to a file.
/// Standalone (no shared state) so it can run from worker threads.
pub fn encode_and_write(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Jpeg => {
            // JPEG has no alpha; the displacement alpha is constant anyway.
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Tga => {
            let encoder = TgaEncoder::new(&mut writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
    }

    Ok(())
}

/// Load any raster format the `image` crate understands, decoded to RGBA.
pub fn load_image_sync(path: &Path) -> Result<RgbaImage, String> {
    image::open(path)
        .map_err(|e| format!("could not load '{}': {}", path.display(), e))
        .map(|img| img.to_rgba8())
}

// ============================================================================
// PARAMS DOCUMENTS
// ============================================================================

/// Read a [`GlassParams`] JSON document.
pub fn load_params(path: &Path) -> Result<GlassParams, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read params '{}': {}", path.display(), e))?;
    serde_json::from_str(&raw)
        .map_err(|e| format!("invalid params file '{}': {}", path.display(), e))
}

/// Write a [`GlassParams`] JSON document (pretty-printed so it stays
/// hand-editable).
pub fn save_params(params: &GlassParams, path: &Path) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(params)
        .map_err(|e| format!("could not serialize params: {}", e))?;
    std::fs::write(path, raw)
        .map_err(|e| format!("could not write params '{}': {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn format_roundtrips_through_extension() {
        for fmt in [
            SaveFormat::Png,
            SaveFormat::Jpeg,
            SaveFormat::Bmp,
            SaveFormat::Tga,
        ] {
            let path = PathBuf::from(format!("map.{}", fmt.extension()));
            assert_eq!(SaveFormat::from_extension(&path), fmt);
        }
    }

    #[test]
    fn unknown_extension_defaults_to_png() {
        assert_eq!(
            SaveFormat::from_extension(Path::new("map.xyz")),
            SaveFormat::Png
        );
        assert_eq!(SaveFormat::from_extension(Path::new("map")), SaveFormat::Png);
    }
}
