//! Mask overlay rendering for preview output
//!
//! Produces the full-frame composite the host shows while the user refines
//! their selection: the source image with the selected region tinted. Purely
//! visual; nothing downstream consumes it.

use crate::decompose::BINARIZE_THRESHOLD;
use crate::types::Mask;
use crate::error::Result;
use image::{DynamicImage, GenericImageView, RgbImage};
use rand::Rng;

/// Default tint, a fixed dodger blue
pub const DEFAULT_TINT: [u8; 3] = [30, 144, 255];

/// Fixed overlay opacity
pub const TINT_OPACITY: f32 = 0.6;

/// Renders a tinted mask preview over the source frame
pub struct OverlayRenderer;

impl OverlayRenderer {
    /// Composite the default tint over every selected pixel
    ///
    /// Standard "over" blending at the fixed opacity:
    /// `out = tint * opacity + base * (1 - opacity)`. The output keeps the
    /// full original frame; no cropping is applied.
    pub fn render(image: &DynamicImage, mask: &Mask) -> Result<RgbImage> {
        Self::render_with_tint(image, mask, DEFAULT_TINT)
    }

    /// Composite a randomly sampled tint over every selected pixel
    pub fn render_random_tint(image: &DynamicImage, mask: &Mask) -> Result<RgbImage> {
        let mut rng = rand::thread_rng();
        let tint = [rng.gen::<u8>(), rng.gen::<u8>(), rng.gen::<u8>()];
        Self::render_with_tint(image, mask, tint)
    }

    /// Composite an explicit tint over every selected pixel
    pub fn render_with_tint(
        image: &DynamicImage,
        mask: &Mask,
        tint: [u8; 3],
    ) -> Result<RgbImage> {
        mask.validate_against(image.dimensions())?;

        let mut output = image.to_rgb8();
        let (width, height) = output.dimensions();

        for y in 0..height {
            for x in 0..width {
                if mask.value_at(x, y) > BINARIZE_THRESHOLD {
                    let pixel = output.get_pixel_mut(x, y);
                    for channel in 0..3 {
                        let blended = f32::from(tint[channel]) * TINT_OPACITY
                            + f32::from(pixel[channel]) * (1.0 - TINT_OPACITY);
                        pixel[channel] = blended.round() as u8;
                    }
                }
            }
        }

        Ok(output)
    }
}
