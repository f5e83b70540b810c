//! The image → text pipeline: resize, reduce to luminance, quantize, lay out.
//!
//! Every stage is a pure function over its input. The caller's image is never
//! modified; each stage returns a new buffer.

use std::io::ErrorKind;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, ImageReader, Luma, Rgb};

use crate::art::{layout, AsciiArt};
use crate::error::{ConvertError, Result};
use crate::palette::Palette;

/// Output width used when the caller does not pick one.
pub const DEFAULT_COLUMNS: u32 = 500;

/// Largest resized image (in pixels, one glyph each) the pipeline accepts.
pub const MAX_OUTPUT_PIXELS: u64 = 1 << 24;

/// Opens and decodes an image, sniffing the format from its content.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ConvertError::MissingImage {
            path: path.to_path_buf(),
        },
        _ => ConvertError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let reader = reader.with_guessed_format().map_err(|source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let img = reader.decode()?;
    log::debug!("loaded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img)
}

/// Size of the resized image: `target_width` wide, height truncated from
/// `target_width * height / width` and never below one row. Sizes above
/// [`MAX_OUTPUT_PIXELS`] are rejected.
pub fn target_dimensions(width: u32, height: u32, target_width: u32) -> Result<(u32, u32)> {
    let invalid = || ConvertError::InvalidGeometry {
        width,
        height,
        target_width,
    };
    if width == 0 || height == 0 || target_width == 0 {
        return Err(invalid());
    }
    let h = (target_width as u64 * height as u64 / width as u64).max(1);
    if target_width as u64 * h > MAX_OUTPUT_PIXELS {
        return Err(invalid());
    }
    let h = u32::try_from(h).map_err(|_| invalid())?;
    Ok((target_width, h))
}

/// Scales `image` to `target_width` columns keeping its aspect ratio and
/// channel layout.
pub fn resize(image: &DynamicImage, target_width: u32) -> Result<DynamicImage> {
    let (orig_w, orig_h) = image.dimensions();
    let (w, h) = target_dimensions(orig_w, orig_h, target_width)?;
    log::debug!("resize {}x{} -> {}x{}", orig_w, orig_h, w, h);

    if w == orig_w && h == orig_h {
        return Ok(image.clone());
    }
    Ok(image.resize_exact(w, h, FilterType::Triangle))
}

/// BT.601 luma in 16-bit fixed point, rounded to nearest.
fn luminance(rgb: Rgb<u8>) -> u8 {
    let r = rgb[0] as u32;
    let g = rgb[1] as u32;
    let b = rgb[2] as u32;
    ((19595 * r + 38470 * g + 7471 * b + 0x8000) >> 16) as u8
}

/// Reduces an image to one 8-bit brightness channel.
pub fn to_greyscale(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(grey) => grey.clone(),
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
            image.to_luma8()
        }
        _ => {
            let rgb = image.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| Luma([luminance(*rgb.get_pixel(x, y))]))
        }
    }
}

/// One glyph per pixel, row-major.
pub fn to_ascii_chars(grey: &GrayImage, palette: &Palette) -> Vec<char> {
    grey.pixels().map(|px| palette.glyph_for(px[0])).collect()
}

/// Runs the full pipeline without touching the filesystem.
pub fn render(image: &DynamicImage, target_width: u32) -> Result<AsciiArt> {
    let resized = resize(image, target_width)?;
    let line_width = resized.width();
    let grey = to_greyscale(&resized);
    let chars = to_ascii_chars(&grey, &Palette::CLASSIC);
    Ok(layout(&chars, line_width))
}

/// Renders `image` and writes it to `destination`.
///
/// An absent image is rejected before any work is done, so no file is
/// created. The text is fully built before the single write.
pub fn image_to_file(image: Option<&DynamicImage>, destination: &Path, target_width: u32) -> Result<AsciiArt> {
    let image = image.ok_or_else(ConvertError::missing)?;
    let art = render(image, target_width)?;
    art.write_to(destination)?;
    Ok(art)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{RgbImage, RgbaImage};

    fn solid_grey(w: u32, h: u32, v: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(w, h, Luma([v])))
    }

    #[test]
    fn height_is_truncated() {
        assert_eq!(target_dimensions(200, 100, 50).unwrap(), (50, 25));
        assert_eq!(target_dimensions(300, 150, 100).unwrap(), (100, 50));
        // 3 * 2 / 4 = 1.5 -> 1
        assert_eq!(target_dimensions(4, 2, 3).unwrap(), (3, 1));
        // 7 * 10 / 3 = 23.33 -> 23
        assert_eq!(target_dimensions(3, 10, 7).unwrap(), (7, 23));
    }

    #[test]
    fn luminance_rounds_to_nearest() {
        // 0.114 * 215 = 24.51 rounds up into the second bucket
        assert_eq!(luminance(Rgb([0, 0, 215])), 25);
        assert_eq!(Palette::CLASSIC.glyph_for(luminance(Rgb([0, 0, 215]))), '#');
        assert_eq!(Palette::CLASSIC.glyph_for(luminance(Rgb([0, 255, 0]))), '+');
    }

    #[test]
    fn oversized_output_is_invalid_geometry() {
        assert!(matches!(target_dimensions(1, 100_000, 500), Err(ConvertError::InvalidGeometry { .. })));
        // 500 x 5000 sits well inside the budget
        assert_eq!(target_dimensions(100, 1000, 500).unwrap(), (500, 5000));
    }

    #[test]
    fn flat_image_keeps_one_row() {
        assert_eq!(target_dimensions(200, 1, 50).unwrap(), (50, 1));
    }

    #[test]
    fn zero_sizes_are_invalid_geometry() {
        assert!(matches!(target_dimensions(0, 10, 5), Err(ConvertError::InvalidGeometry { .. })));
        assert!(matches!(target_dimensions(10, 0, 5), Err(ConvertError::InvalidGeometry { .. })));
        assert!(matches!(target_dimensions(10, 10, 0), Err(ConvertError::InvalidGeometry { .. })));
    }

    #[test]
    fn resize_keeps_channel_layout() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(20, 10));
        let out = resize(&img, 10).unwrap();
        assert_eq!(out.dimensions(), (10, 5));
        assert!(matches!(out, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn resize_leaves_input_untouched() {
        let img = solid_grey(8, 4, 77);
        let before = img.clone();
        let _ = resize(&img, 2).unwrap();
        assert_eq!(img, before);
    }

    #[test]
    fn luminance_weights() {
        assert_eq!(luminance(Rgb([255, 0, 0])), 76);
        assert_eq!(luminance(Rgb([0, 255, 0])), 150);
        assert_eq!(luminance(Rgb([0, 0, 255])), 29);
        assert_eq!(luminance(Rgb([255, 255, 255])), 255);
        assert_eq!(luminance(Rgb([130, 130, 130])), 130);
    }

    #[test]
    fn greyscale_passes_through_luma8() {
        let img = solid_grey(3, 2, 42);
        let grey = to_greyscale(&img);
        assert_eq!(grey.dimensions(), (3, 2));
        assert!(grey.pixels().all(|p| p[0] == 42));
    }

    #[test]
    fn greyscale_of_rgba_ignores_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, image::Rgba([0, 255, 0, 0])));
        let grey = to_greyscale(&img);
        assert!(grey.pixels().all(|p| p[0] == 150));
    }

    #[test]
    fn brightness_buffer_length_matches_area() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(7, 3));
        let grey = to_greyscale(&img);
        assert_eq!(grey.as_raw().len(), 7 * 3);
    }

    #[test]
    fn quantizes_row_major() {
        let grey = GrayImage::from_raw(2, 2, vec![0, 25, 130, 255]).unwrap();
        assert_eq!(to_ascii_chars(&grey, &Palette::CLASSIC), vec!['@', '#', '*', '.']);
    }

    #[test]
    fn solid_grey_four_by_two_renders_two_stars() {
        let art = render(&solid_grey(4, 2, 130), 2).unwrap();
        assert_eq!(art.as_str(), "**\n");
        assert_eq!((art.width(), art.height()), (2, 1));
    }

    #[test]
    fn glyph_count_matches_resized_area() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 90])));
        let art = render(&img, 40).unwrap();
        let glyphs = art.as_str().chars().filter(|c| *c != '\n').count();
        assert_eq!(glyphs, 40 * 30);
        assert!(art.lines().all(|l| l.chars().count() == 40));
        assert!(art.as_str().chars().filter(|c| *c != '\n').all(|c| Palette::CLASSIC.contains(c)));
    }

    #[test]
    fn rendering_is_deterministic() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(33, 17, |x, y| Rgb([(x * 7) as u8, (y * 13) as u8, ((x + y) * 3) as u8])));
        assert_eq!(render(&img, 11).unwrap(), render(&img, 11).unwrap());
    }

    #[test]
    fn absent_image_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.txt");
        let err = image_to_file(None, &dest, DEFAULT_COLUMNS).unwrap_err();
        assert!(matches!(err, ConvertError::MissingImage { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn invalid_width_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.txt");
        let img = solid_grey(4, 4, 0);
        let err = image_to_file(Some(&img), &dest, 0).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidGeometry { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn load_missing_file_is_missing_image() {
        let err = load_image(Path::new("definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, ConvertError::MissingImage { .. }));
    }

    #[test]
    fn load_sniffs_format_behind_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let png_path = dir.path().join("pic.png");
        GrayImage::from_pixel(3, 3, Luma([200])).save(&png_path).unwrap();
        let disguised = dir.path().join("pic.jpg");
        std::fs::rename(&png_path, &disguised).unwrap();
        let img = load_image(&disguised).unwrap();
        assert_eq!(img.dimensions(), (3, 3));
    }
}
