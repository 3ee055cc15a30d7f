use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use reimburse_core::PreprocessConfig;
use std::io::Cursor;
use thiserror::Error;

use crate::loader::RawImage;

/// Minimum per-pixel difference the unsharp mask reacts to.
const UNSHARPEN_THRESHOLD: i32 = 1;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// A binarized page ready for text recognition.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    /// Every pixel is either 0 (ink) or 255 (paper).
    pub image: GrayImage,
    /// Isotropic upscale factor applied to the source (>= 1.0).
    pub scale: f32,
    /// Otsu threshold chosen on the stretched (and, if enabled, sharpened) page.
    pub threshold: u8,
}

impl PreprocessedImage {
    pub fn to_png(&self) -> Result<Vec<u8>, PreprocessError> {
        let mut buf = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| PreprocessError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

/// Upscale → grayscale → contrast stretch → optional sharpen → Otsu binarization.
///
/// Sharpening has to run on the grayscale page: an unsharp mask over a
/// two-valued image only pushes pixels past 0 or 255, where they are clamped back.
pub fn preprocess(raw: &RawImage, config: &PreprocessConfig) -> PreprocessedImage {
    let (upscaled, scale) = upscale_to_floor(&raw.image, config.resolution_floor);

    let mut gray: GrayImage = upscaled.to_luma8();
    stretch_contrast(&mut gray, config.clip_percent);

    if config.sharpen {
        gray = imageops::unsharpen(&gray, config.sharpen_sigma, UNSHARPEN_THRESHOLD);
    }

    let threshold = otsu_threshold(&gray);
    binarize(&mut gray, threshold);

    tracing::debug!(
        width = gray.width(),
        height = gray.height(),
        scale,
        threshold,
        "preprocessed receipt image"
    );

    PreprocessedImage { image: gray, scale, threshold }
}

/// Recognition accuracy drops sharply below ~300 DPI, so small scans are
/// enlarged until their longest side reaches `floor`. Never shrinks.
fn upscale_to_floor(img: &DynamicImage, floor: u32) -> (DynamicImage, f32) {
    let longest = img.width().max(img.height());
    if longest == 0 || longest >= floor {
        return (img.clone(), 1.0);
    }
    let scale = floor as f64 / longest as f64;
    let w = ((img.width() as f64 * scale).round() as u32).max(1);
    let h = ((img.height() as f64 * scale).round() as u32).max(1);
    (img.resize_exact(w, h, FilterType::Lanczos3), scale as f32)
}

fn histogram(gray: &GrayImage) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for p in gray.pixels() {
        hist[p[0] as usize] += 1;
    }
    hist
}

/// Clip `clip_percent`% of the pixels at each end, then stretch the rest to 0..=255.
fn stretch_contrast(gray: &mut GrayImage, clip_percent: f32) {
    let hist = histogram(gray);
    let total: u64 = hist.iter().sum();
    let clip = (total as f64 * clip_percent as f64 / 100.0) as u64;

    let mut acc = 0u64;
    let low = hist
        .iter()
        .position(|&c| {
            acc += c;
            acc > clip
        })
        .unwrap_or(0);

    acc = 0;
    let high = hist
        .iter()
        .rposition(|&c| {
            acc += c;
            acc > clip
        })
        .unwrap_or(255);

    if high <= low {
        // Uniform (or nearly uniform) page: nothing to stretch.
        return;
    }

    let (low, range) = (low as u32, (high - low) as u32);
    for p in gray.pixels_mut() {
        let v = (p[0] as u32).clamp(low, low + range);
        *p = Luma([((v - low) * 255 / range) as u8]);
    }
}

/// Otsu's method: the threshold maximizing between-class variance, which is
/// the same as minimizing the combined intra-class variance.
/// Pixels `<= threshold` form the dark class.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let hist = histogram(gray);
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return 127;
    }

    let sum_total: f64 = hist.iter().enumerate().map(|(i, &c)| i as f64 * c as f64).sum();

    let mut sum_dark = 0.0f64;
    let mut weight_dark = 0u64;
    let mut best_variance = 0.0f64;
    let mut best = 0u8;

    for (t, &count) in hist.iter().enumerate() {
        weight_dark += count;
        if weight_dark == 0 {
            continue;
        }
        let weight_light = total - weight_dark;
        if weight_light == 0 {
            break;
        }
        sum_dark += t as f64 * count as f64;
        let mean_dark = sum_dark / weight_dark as f64;
        let mean_light = (sum_total - sum_dark) / weight_light as f64;
        let variance =
            weight_dark as f64 * weight_light as f64 * (mean_dark - mean_light).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best = t as u8;
        }
    }
    best
}

fn binarize(gray: &mut GrayImage, threshold: u8) {
    for p in gray.pixels_mut() {
        p[0] = if p[0] <= threshold { 0 } else { 255 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};

    fn raw(img: DynamicImage) -> RawImage {
        RawImage { image: img, format: ImageFormat::Png }
    }

    fn solid_gray(width: u32, height: u32, value: u8) -> DynamicImage {
        let img: GrayImage = ImageBuffer::from_fn(width, height, |_, _| Luma([value]));
        DynamicImage::ImageLuma8(img)
    }

    fn gradient_gray(width: u32, height: u32) -> GrayImage {
        ImageBuffer::from_fn(width, height, |x, _| Luma([(x * 255 / (width - 1)) as u8]))
    }

    /// Dark "text" stripes on a light, unevenly lit page.
    fn fake_receipt(width: u32, height: u32) -> DynamicImage {
        let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
            let paper = 170 + (x * 60 / width) as u8;
            if y % 8 < 2 {
                Rgb([40, 40, 50])
            } else {
                Rgb([paper, paper, paper - 10])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    fn config(floor: u32) -> PreprocessConfig {
        PreprocessConfig { resolution_floor: floor, ..PreprocessConfig::default() }
    }

    fn is_binary(img: &GrayImage) -> bool {
        img.pixels().all(|p| p[0] == 0 || p[0] == 255)
    }

    #[test]
    fn small_image_is_upscaled_to_floor() {
        let out = preprocess(&raw(fake_receipt(40, 20)), &config(120));
        assert_eq!((out.image.width(), out.image.height()), (120, 60));
        assert!((out.scale - 3.0).abs() < 1e-6);
    }

    #[test]
    fn image_at_floor_is_not_upscaled() {
        let out = preprocess(&raw(fake_receipt(120, 30)), &config(120));
        assert_eq!((out.image.width(), out.image.height()), (120, 30));
        assert_eq!(out.scale, 1.0);

        let out = preprocess(&raw(fake_receipt(200, 64)), &config(120));
        assert_eq!((out.image.width(), out.image.height()), (200, 64));
    }

    #[test]
    fn upscale_preserves_aspect_ratio() {
        let out = preprocess(&raw(fake_receipt(30, 90)), &config(300));
        assert_eq!((out.image.width(), out.image.height()), (100, 300));
    }

    #[test]
    fn output_is_two_valued() {
        let out = preprocess(&raw(fake_receipt(64, 64)), &config(64));
        assert!(is_binary(&out.image));
        // Both classes survive on a page with text.
        assert!(out.image.pixels().any(|p| p[0] == 0));
        assert!(out.image.pixels().any(|p| p[0] == 255));
    }

    #[test]
    fn sharpened_output_is_still_two_valued() {
        let cfg = PreprocessConfig { sharpen: true, ..config(64) };
        let out = preprocess(&raw(fake_receipt(64, 64)), &cfg);
        assert!(is_binary(&out.image));
    }

    /// Ink on the left half, paper on the right, and one faint
    /// pencil-grey column (150) in the paper.
    fn faint_stroke_page() -> DynamicImage {
        let img: GrayImage = ImageBuffer::from_fn(64, 16, |x, _| match x {
            0..=31 => Luma([0]),
            48 => Luma([150]),
            _ => Luma([255]),
        });
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn sharpening_recovers_faint_stroke() {
        let plain = preprocess(&raw(faint_stroke_page()), &config(64));
        let sharp_cfg = PreprocessConfig { sharpen: true, ..config(64) };
        let sharp = preprocess(&raw(faint_stroke_page()), &sharp_cfg);

        // Lighter than mid-grey, so plain Otsu files the stroke with the paper.
        assert_eq!(plain.image.get_pixel(48, 8)[0], 255);
        // The unsharp mask darkens it against the white around it.
        assert_eq!(sharp.image.get_pixel(48, 8)[0], 0);
        assert_ne!(plain.image, sharp.image);
        assert!(is_binary(&sharp.image));
    }

    #[test]
    fn uniform_image_does_not_panic() {
        let out = preprocess(&raw(solid_gray(10, 10, 128)), &config(10));
        assert_eq!((out.image.width(), out.image.height()), (10, 10));
        assert!(is_binary(&out.image));
    }

    #[test]
    fn gradient_stretches_to_full_range() {
        let mut gray = gradient_gray(256, 1);
        stretch_contrast(&mut gray, 1.0);
        let min = gray.pixels().map(|p| p[0]).min().unwrap();
        let max = gray.pixels().map(|p| p[0]).max().unwrap();
        assert_eq!(min, 0);
        assert_eq!(max, 255);
    }

    #[test]
    fn clipping_ignores_outliers() {
        // 1 black speck among 999 pixels in the 100..=150 band.
        let mut gray: GrayImage = ImageBuffer::from_fn(1000, 1, |x, _| {
            if x == 0 { Luma([0]) } else { Luma([100 + (x % 51) as u8]) }
        });
        stretch_contrast(&mut gray, 1.0);
        // The band itself now spans (close to) the whole range.
        let band_max = gray.pixels().skip(1).map(|p| p[0]).max().unwrap();
        assert_eq!(band_max, 255);
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let gray: GrayImage =
            ImageBuffer::from_fn(100, 1, |x, _| if x < 30 { Luma([20]) } else { Luma([220]) });
        let t = otsu_threshold(&gray);
        assert!((20..220).contains(&t), "threshold was {t}");
    }

    #[test]
    fn to_png_produces_png_header() {
        let out = preprocess(&raw(solid_gray(4, 4, 100)), &config(4));
        let png = out.to_png().unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }
}
