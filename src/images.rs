// fsgate - Image Tools
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// get_image: loads an image for a client, shrinking it first when the
// file is over the configured size. Pipeline: decode, apply the EXIF
// orientation, bound the longer side, re-encode (PNG with alpha stays
// PNG, everything else becomes JPEG). A failed shrink falls back to the
// original bytes when they are under the hard ceiling.
// list_images: image files in a directory, sorted by name.

use crate::config::{ServerConfig, IMAGE_EXTENSIONS, IMAGE_HARD_LIMIT_BYTES};
use crate::error::{FsError, IoContext, Result};
use crate::inspect;
use crate::outcome::{with_commas, Outcome};
use crate::paths;
use crate::validate::{validate_directory_path, validate_file_path};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const PREVIEW_CHARS: usize = 100;

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

fn size_line(bytes: u64) -> String {
    format!("{} bytes ({:.2} MB)", with_commas(bytes), megabytes(bytes))
}

pub fn is_image_path(path: &Path) -> bool {
    paths::extension_lower(path)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

// ============================================================================
// GET IMAGE
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageArgs {
    pub file_path: String,
    #[serde(default)]
    pub max_size: Option<u32>,
    #[serde(default)]
    pub quality: Option<u8>,
}

/// Image bytes ready to hand to a client
#[derive(Debug, Clone, Serialize)]
pub struct ImagePayload {
    pub path: PathBuf,
    pub mime_type: String,
    pub original_size: u64,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub compressed: bool,
    pub quality: u8,
    pub max_dimension: u32,
}

impl ImagePayload {
    pub fn to_base64(&self) -> String {
        B64.encode(&self.data)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    pub fn to_outcome(&self) -> Outcome {
        let data_url = self.data_url();
        let encoded_len = self.data.len().div_ceil(3) * 4;
        let preview: String = data_url.chars().take(PREVIEW_CHARS).collect();
        let compression = if self.compressed {
            format!("Yes (quality: {})", self.quality)
        } else {
            "No (original bytes)".to_string()
        };

        Outcome::success(format!("Image: {}", paths::display_name(&self.path)))
            .field("Path", self.path.display())
            .field("Type", &self.mime_type)
            .field("Original size", size_line(self.original_size))
            .field("Returned size", size_line(self.data.len() as u64))
            .field("Compressed", compression)
            .field("Max dimension", format!("{}px", self.max_dimension))
            .field("Base64 length", with_commas(encoded_len as u64))
            .body(format!("Data URL preview:\n{}...", preview))
    }
}

/// Decode, orient, bound and re-encode. Returns the bytes and their MIME type.
fn shrink(path: &Path, max_dimension: u32, quality: u8) -> Result<(Vec<u8>, &'static str)> {
    let reader = ImageReader::open(path).at("Open", path)?.with_guessed_format().at("Read", path)?;
    let format = reader.format();
    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);

    if img.width() > max_dimension || img.height() > max_dimension {
        img = img.resize(max_dimension, max_dimension, FilterType::Lanczos3);
    }

    let mut out = Vec::new();
    if format == Some(ImageFormat::Png) && img.color().has_alpha() {
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
        return Ok((out, "image/png"));
    }

    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
    Ok((out, "image/jpeg"))
}

pub fn load_image(args: &ImageArgs, config: &ServerConfig) -> Result<ImagePayload> {
    let path = validate_file_path(&args.file_path, true)?;
    if !is_image_path(&path) {
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        return Err(FsError::validation(format!(
            "Not an image file: {} (extension: {})",
            path.display(),
            ext
        )));
    }

    let max_dimension = args.max_size.unwrap_or(config.max_image_dimension).max(1);
    let quality = args.quality.unwrap_or(config.image_quality);
    if !(1..=100).contains(&quality) {
        return Err(FsError::validation(format!(
            "Image quality must be between 1 and 100, got {}",
            quality
        )));
    }

    let original_size = std::fs::metadata(&path).at("Stat", &path)?.len();
    let mime = inspect::guess_mime(&path).unwrap_or_else(|| "image/jpeg".to_string());
    let needs_shrink = original_size > config.max_image_size_bytes();

    let payload = |data: Vec<u8>, mime_type: String, compressed: bool| ImagePayload {
        path: path.clone(),
        mime_type,
        original_size,
        data,
        compressed,
        quality,
        max_dimension,
    };

    if !(needs_shrink && config.enable_image_compression) {
        let data = std::fs::read(&path).at("Read", &path)?;
        return Ok(payload(data, mime, false));
    }

    match shrink(&path, max_dimension, quality) {
        Ok((data, mime_type)) => {
            log::info!(
                "Compressed {} from {} to {} bytes",
                path.display(),
                original_size,
                data.len()
            );
            Ok(payload(data, mime_type.to_string(), true))
        }
        Err(e) if original_size < IMAGE_HARD_LIMIT_BYTES => {
            log::warn!("Image compression failed for {}: {}; returning original", path.display(), e);
            let data = std::fs::read(&path).at("Read", &path)?;
            Ok(payload(data, mime, false))
        }
        Err(e) => Err(FsError::TooLarge(format!(
            "Image too large and compression failed: {}",
            e
        ))),
    }
}

pub fn get_image(args: &ImageArgs, config: &ServerConfig) -> Result<Outcome> {
    Ok(load_image(args, config)?.to_outcome())
}

// ============================================================================
// LIST IMAGES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListImagesArgs {
    pub directory_path: String,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageEntry {
    pub name: String,
    pub path: PathBuf,
    pub mime_type: String,
    pub size: u64,
}

pub fn scan_images(dir: &Path, recursive: bool) -> Vec<ImageEntry> {
    let walker = WalkDir::new(dir).min_depth(1);
    let walker = if recursive { walker } else { walker.max_depth(1) };

    let mut images: Vec<ImageEntry> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_image_path(e.path()))
        .map(|e| ImageEntry {
            name: e.file_name().to_string_lossy().to_string(),
            mime_type: inspect::guess_mime(e.path()).unwrap_or_else(|| "unknown".to_string()),
            size: e.metadata().map(|m| m.len()).unwrap_or(0),
            path: e.into_path(),
        })
        .collect();
    images.sort_by(|a, b| a.name.cmp(&b.name));
    images
}

pub fn list_images(args: &ListImagesArgs, _config: &ServerConfig) -> Result<Outcome> {
    let dir = validate_directory_path(&args.directory_path, true)?;
    let images = scan_images(&dir, args.recursive);

    let body = if images.is_empty() {
        "No image files found.".to_string()
    } else {
        images
            .iter()
            .enumerate()
            .map(|(i, img)| {
                format!(
                    "{}. {}\n   Path: {}\n   Type: {}\n   Size: {:.2} MB ({} bytes)",
                    i + 1,
                    img.name,
                    img.path.display(),
                    img.mime_type,
                    megabytes(img.size),
                    with_commas(img.size)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    Ok(Outcome::success(format!("Images in {}", dir.display()))
        .field("Total", images.len())
        .field("Recursive", if args.recursive { "Yes" } else { "No" })
        .body(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn raw(p: &Path) -> String {
        p.to_str().unwrap().to_string()
    }

    #[test]
    fn small_image_returned_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dot.png");
        RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])).save(&path).unwrap();

        let payload = load_image(&ImageArgs { file_path: raw(&path), ..Default::default() }, &ServerConfig::default()).unwrap();
        assert!(!payload.compressed);
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.data, std::fs::read(&path).unwrap());
        assert!(payload.data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn oversized_image_is_shrunk() {
        let dir = TempDir::new().unwrap();
        let opaque = dir.path().join("wide.png");
        RgbImage::from_pixel(400, 200, Rgb([10, 20, 30])).save(&opaque).unwrap();
        let alpha = dir.path().join("alpha.png");
        RgbaImage::from_pixel(400, 200, Rgba([10, 20, 30, 128])).save(&alpha).unwrap();

        // a zero ceiling forces the shrink path
        let config = ServerConfig { max_image_size_mb: 0, ..Default::default() };
        let args = ImageArgs { file_path: raw(&opaque), max_size: Some(100), quality: Some(70) };
        let payload = load_image(&args, &config).unwrap();
        assert!(payload.compressed);
        assert_eq!(payload.mime_type, "image/jpeg");
        let decoded = image::load_from_memory(&payload.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));

        let args = ImageArgs { file_path: raw(&alpha), ..args };
        assert_eq!(load_image(&args, &config).unwrap().mime_type, "image/png");
    }

    #[test]
    fn broken_image_falls_back_to_original() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        let config = ServerConfig { max_image_size_mb: 0, ..Default::default() };
        let payload = load_image(&ImageArgs { file_path: raw(&path), ..Default::default() }, &config).unwrap();
        assert!(!payload.compressed);
        assert_eq!(payload.data, b"definitely not a jpeg");
    }

    #[test]
    fn non_image_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "x").unwrap();
        let err = load_image(&ImageArgs { file_path: raw(&path), ..Default::default() }, &ServerConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Not an image file"));
    }

    #[test]
    fn lists_images_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.gif"), "x").unwrap();
        std::fs::write(dir.path().join("a.PNG"), "x").unwrap();
        std::fs::write(dir.path().join("sub/c.jpg"), "x").unwrap();
        std::fs::write(dir.path().join("readme.md"), "x").unwrap();

        let names: Vec<String> = scan_images(dir.path(), false).into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["a.PNG", "b.gif"]);
        assert_eq!(scan_images(dir.path(), true).len(), 3);

        let out = list_images(&ListImagesArgs { directory_path: raw(dir.path()), recursive: true }, &ServerConfig::default()).unwrap();
        assert_eq!(out.get("Total"), Some("3"));
    }
}
