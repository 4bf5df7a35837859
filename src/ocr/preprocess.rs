//! CAPTCHA image preprocessing.
//!
//! Turns the raw CAPTCHA screenshot into a binarized image that the OCR
//! engine reads reliably: grayscale, optional upscale, contrast boost, then a
//! per-pixel luminance cutoff. Two cutoff strategies are provided:
//!
//! - **Threshold**: fixed cutoff (150 works well for the portal's CAPTCHA)
//! - **Otsu**: cutoff derived from the image histogram, for noisier images

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageFormat, Luma};
use thiserror::Error;

/// Errors from preprocessing.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to decode CAPTCHA image: {0}")]
    Decode(String),

    #[error("Failed to encode preprocessed image: {0}")]
    Encode(String),
}

/// Preprocessing strategies selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessorKind {
    #[default]
    Threshold,
    Otsu,
}

/// Settings shared by both strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessSettings {
    /// Contrast adjustment passed to `imageops::contrast` (40.0 roughly
    /// doubles contrast; 0.0 disables the step).
    pub contrast: f32,
    /// Swap black and white after thresholding.
    pub invert: bool,
    /// Integer upscale factor applied before thresholding (1 = none).
    pub scale: u32,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            contrast: 40.0,
            invert: false,
            scale: 1,
        }
    }
}

/// Turns raw image bytes into an OCR-ready binary image.
pub trait Preprocessor: Send + Sync {
    fn kind(&self) -> PreprocessorKind;

    fn preprocess(&self, image_bytes: &[u8]) -> Result<GrayImage, PreprocessError>;
}

/// Fixed luminance cutoff.
pub struct ThresholdPreprocessor {
    cutoff: u8,
    settings: PreprocessSettings,
}

impl ThresholdPreprocessor {
    pub fn new(cutoff: u8, settings: PreprocessSettings) -> Self {
        Self { cutoff, settings }
    }
}

impl Default for ThresholdPreprocessor {
    fn default() -> Self {
        Self::new(150, PreprocessSettings::default())
    }
}

impl Preprocessor for ThresholdPreprocessor {
    fn kind(&self) -> PreprocessorKind {
        PreprocessorKind::Threshold
    }

    fn preprocess(&self, image_bytes: &[u8]) -> Result<GrayImage, PreprocessError> {
        let gray = enhance(decode_grayscale(image_bytes)?, &self.settings);
        Ok(binarize(&gray, self.cutoff, self.settings.invert))
    }
}

/// Histogram-derived cutoff (Otsu's method).
pub struct OtsuPreprocessor {
    settings: PreprocessSettings,
}

impl OtsuPreprocessor {
    pub fn new(settings: PreprocessSettings) -> Self {
        Self { settings }
    }
}

impl Preprocessor for OtsuPreprocessor {
    fn kind(&self) -> PreprocessorKind {
        PreprocessorKind::Otsu
    }

    fn preprocess(&self, image_bytes: &[u8]) -> Result<GrayImage, PreprocessError> {
        let gray = enhance(decode_grayscale(image_bytes)?, &self.settings);
        let cutoff = otsu_level(&gray);
        Ok(binarize(&gray, cutoff, self.settings.invert))
    }
}

/// Build the configured preprocessor.
pub fn build_preprocessor(
    kind: PreprocessorKind,
    cutoff: u8,
    settings: PreprocessSettings,
) -> Box<dyn Preprocessor> {
    match kind {
        PreprocessorKind::Threshold => Box::new(ThresholdPreprocessor::new(cutoff, settings)),
        PreprocessorKind::Otsu => Box::new(OtsuPreprocessor::new(settings)),
    }
}

/// Decode any supported image format and convert to 8-bit grayscale.
pub fn decode_grayscale(image_bytes: &[u8]) -> Result<GrayImage, PreprocessError> {
    image::load_from_memory(image_bytes)
        .map(|img| img.to_luma8())
        .map_err(|e| PreprocessError::Decode(e.to_string()))
}

fn enhance(gray: GrayImage, settings: &PreprocessSettings) -> GrayImage {
    let gray = if settings.scale > 1 {
        let (w, h) = gray.dimensions();
        imageops::resize(
            &gray,
            w * settings.scale,
            h * settings.scale,
            FilterType::Lanczos3,
        )
    } else {
        gray
    };

    if settings.contrast != 0.0 {
        imageops::contrast(&gray, settings.contrast)
    } else {
        gray
    }
}

/// Pixels brighter than `cutoff` become white, everything else black.
pub fn binarize(gray: &GrayImage, cutoff: u8, invert: bool) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in gray.enumerate_pixels() {
        let bright = pixel[0] > cutoff;
        let value = if bright != invert { 255u8 } else { 0u8 };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

/// Otsu's method: the cutoff maximising between-class variance.
pub fn otsu_level(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total = gray.width() as f64 * gray.height() as f64;
    if total == 0.0 {
        return 0;
    }

    let weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut background_weight = 0.0;
    let mut background_sum = 0.0;
    let mut best_level = 0u8;
    let mut best_variance = 0.0;

    for (level, &count) in histogram.iter().enumerate() {
        background_weight += count as f64;
        if background_weight == 0.0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0.0 {
            break;
        }

        background_sum += level as f64 * count as f64;
        let background_mean = background_sum / background_weight;
        let foreground_mean = (weighted_sum - background_sum) / foreground_weight;
        let diff = background_mean - foreground_mean;
        let variance = background_weight * foreground_weight * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

/// Encode a grayscale image as PNG bytes.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Vec<u8> {
        let img = GrayImage::from_fn(width, height, |x, y| Luma([f(x, y)]));
        encode_png(&img).unwrap()
    }

    #[test]
    fn test_binarize_cutoff() {
        let mut img = GrayImage::new(3, 1);
        img.put_pixel(0, 0, Luma([100]));
        img.put_pixel(1, 0, Luma([150]));
        img.put_pixel(2, 0, Luma([151]));

        let result = binarize(&img, 150, false);
        assert_eq!(result.get_pixel(0, 0)[0], 0, "Dark pixel should become black");
        assert_eq!(result.get_pixel(1, 0)[0], 0, "Cutoff itself is not bright");
        assert_eq!(result.get_pixel(2, 0)[0], 255, "Bright pixel should become white");
    }

    #[test]
    fn test_binarize_inverted() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, Luma([10]));
        img.put_pixel(1, 0, Luma([240]));

        let result = binarize(&img, 150, true);
        assert_eq!(result.get_pixel(0, 0)[0], 255);
        assert_eq!(result.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let err = ThresholdPreprocessor::default()
            .preprocess(b"definitely not an image")
            .unwrap_err();
        assert!(matches!(err, PreprocessError::Decode(_)));
    }

    #[test]
    fn test_threshold_output_is_binary() {
        let png = png_from_fn(20, 10, |x, _| (x * 12) as u8);
        let out = ThresholdPreprocessor::default().preprocess(&png).unwrap();
        assert_eq!(out.dimensions(), (20, 10));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_scale_enlarges_output() {
        let png = png_from_fn(8, 4, |_, _| 200);
        let settings = PreprocessSettings {
            scale: 3,
            ..Default::default()
        };
        let out = ThresholdPreprocessor::new(150, settings)
            .preprocess(&png)
            .unwrap();
        assert_eq!(out.dimensions(), (24, 12));
    }

    #[test]
    fn test_otsu_separates_bimodal_image() {
        let img = GrayImage::from_fn(10, 10, |x, _| if x < 5 { Luma([40]) } else { Luma([210]) });
        let level = otsu_level(&img);
        assert!((40..210).contains(&level), "level {} not between modes", level);

        let binary = binarize(&img, level, false);
        assert_eq!(binary.get_pixel(0, 0)[0], 0);
        assert_eq!(binary.get_pixel(9, 0)[0], 255);
    }

    #[test]
    fn test_otsu_preprocessor_is_deterministic() {
        let png = png_from_fn(16, 16, |x, y| if (x + y) % 3 == 0 { 30 } else { 220 });
        let pre = OtsuPreprocessor::new(PreprocessSettings::default());
        assert_eq!(pre.preprocess(&png).unwrap(), pre.preprocess(&png).unwrap());
    }
}
