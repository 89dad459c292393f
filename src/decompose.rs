//! Hole/object image decomposition
//!
//! The algorithmic core of the pipeline: given the source image and the
//! selected mask, produce the two complementary derivatives. The hole image
//! is the source with the selected region punched transparent, cropped to
//! the bounding box of what remains; the object image is the selected region
//! alone, transparent elsewhere, cropped to its own bounding box.

use crate::error::{CutoutError, Result};
use crate::types::{BoundingBox, DecompositionResult, Mask};
use image::{DynamicImage, GenericImageView, RgbaImage};
use tracing::debug;

/// Fixed binarization threshold: mask values strictly above become selected
pub const BINARIZE_THRESHOLD: f32 = 0.5;

/// Which side of the binarized mask a derivative keeps visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeepRegion {
    /// Pixels where the mask is 0 (the hole image keeps the background)
    Background,
    /// Pixels where the mask is 1 (the object image keeps the selection)
    Selection,
}

/// Deterministic pixel-level decomposition of an image against a mask
pub struct ImageDecomposer;

impl ImageDecomposer {
    /// Decompose `image` into hole and object derivatives using `mask`
    ///
    /// The source image is never mutated: each derivative starts from its own
    /// alpha-augmented copy, so a failure computing one derivative cannot
    /// corrupt the input still needed for the other. 3-channel sources gain a
    /// fully opaque alpha channel before compositing.
    ///
    /// # Errors
    ///
    /// - `CutoutError::MaskDimensionMismatch` when mask and image disagree
    /// - `CutoutError::EmptyBackgroundRegion` when the mask selects everything
    /// - `CutoutError::EmptySelection` when the mask selects nothing
    pub fn decompose(image: &DynamicImage, mask: &Mask) -> Result<DecompositionResult> {
        mask.validate_against(image.dimensions())?;

        let selected = Self::binarize(mask);

        let (hole, hole_bounds) = Self::carve(image, &selected, KeepRegion::Background)?;
        let (object, object_bounds) = Self::carve(image, &selected, KeepRegion::Selection)?;

        debug!(
            hole_bounds = ?hole_bounds,
            object_bounds = ?object_bounds,
            "decomposition complete"
        );

        Ok(DecompositionResult {
            hole,
            hole_bounds,
            object,
            object_bounds,
        })
    }

    /// Build only the hole derivative: source with the selection punched out
    ///
    /// # Errors
    ///
    /// - `CutoutError::MaskDimensionMismatch` when mask and image disagree
    /// - `CutoutError::EmptyBackgroundRegion` when the mask selects everything
    pub fn decompose_hole(image: &DynamicImage, mask: &Mask) -> Result<(RgbaImage, BoundingBox)> {
        mask.validate_against(image.dimensions())?;
        Self::carve(image, &Self::binarize(mask), KeepRegion::Background)
    }

    /// Build only the object derivative: the selection alone
    ///
    /// # Errors
    ///
    /// - `CutoutError::MaskDimensionMismatch` when mask and image disagree
    /// - `CutoutError::EmptySelection` when the mask selects nothing
    pub fn decompose_object(image: &DynamicImage, mask: &Mask) -> Result<(RgbaImage, BoundingBox)> {
        mask.validate_against(image.dimensions())?;
        Self::carve(image, &Self::binarize(mask), KeepRegion::Selection)
    }

    /// Binarize the mask at the fixed threshold
    ///
    /// Row-major, one flag per pixel, `true` = selected. NaN values never
    /// exceed the threshold and land on the background side.
    fn binarize(mask: &Mask) -> Vec<bool> {
        mask.data.iter().map(|&v| v > BINARIZE_THRESHOLD).collect()
    }

    /// Build one derivative: punch alpha, compute bounds, crop
    fn carve(
        image: &DynamicImage,
        selected: &[bool],
        keep: KeepRegion,
    ) -> Result<(RgbaImage, BoundingBox)> {
        let (width, height) = image.dimensions();

        // Independent copy per derivative; to_rgba8 synthesizes an opaque
        // alpha channel for 3-channel sources and preserves an existing one.
        let mut rgba = image.to_rgba8();

        for y in 0..height {
            for x in 0..width {
                let index = (y as usize) * (width as usize) + x as usize;
                let is_selected = selected.get(index).copied().unwrap_or(false);
                let punched = match keep {
                    KeepRegion::Background => is_selected,
                    KeepRegion::Selection => !is_selected,
                };
                if punched {
                    rgba.get_pixel_mut(x, y)[3] = 0;
                }
            }
        }

        let bounds = Self::kept_bounds(selected, (width, height), keep)?;
        let cropped = image::imageops::crop_imm(
            &rgba,
            bounds.x_min,
            bounds.y_min,
            bounds.width(),
            bounds.height(),
        )
        .to_image();

        Ok((cropped, bounds))
    }

    /// Bounding box of the pixels a derivative keeps
    fn kept_bounds(
        selected: &[bool],
        dimensions: (u32, u32),
        keep: KeepRegion,
    ) -> Result<BoundingBox> {
        let (width, height) = dimensions;

        let mut y_min = None;
        let mut y_max = 0;
        let mut x_min = width;
        let mut x_max = 0;

        for y in 0..height {
            for x in 0..width {
                let index = (y as usize) * (width as usize) + x as usize;
                let is_selected = selected.get(index).copied().unwrap_or(false);
                let kept = match keep {
                    KeepRegion::Background => !is_selected,
                    KeepRegion::Selection => is_selected,
                };
                if kept {
                    if y_min.is_none() {
                        y_min = Some(y);
                    }
                    y_max = y;
                    x_min = x_min.min(x);
                    x_max = x_max.max(x);
                }
            }
        }

        match y_min {
            Some(y_min) => BoundingBox::new(y_min, y_max, x_min, x_max),
            None => Err(match keep {
                KeepRegion::Background => CutoutError::EmptyBackgroundRegion,
                KeepRegion::Selection => CutoutError::EmptySelection,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Opaque RGBA test frame with a distinct color per pixel
    fn test_image(width: u32, height: u32) -> DynamicImage {
        let mut image = RgbaImage::new(width, height);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 40) as u8, (y * 40) as u8, 128, 255]);
        }
        DynamicImage::ImageRgba8(image)
    }

    fn mask_from_flags(flags: &[u8], dimensions: (u32, u32)) -> Mask {
        let data = flags.iter().map(|&f| f32::from(f)).collect();
        Mask::new(data, dimensions).unwrap()
    }

    #[test]
    fn test_center_block_scenario() {
        // 4x4 frame, 2x2 center block selected.
        let image = test_image(4, 4);
        #[rustfmt::skip]
        let mask = mask_from_flags(
            &[
                0, 0, 0, 0,
                0, 1, 1, 0,
                0, 1, 1, 0,
                0, 0, 0, 0,
            ],
            (4, 4),
        );

        let result = ImageDecomposer::decompose(&image, &mask).unwrap();

        // Object crops to the center block.
        assert_eq!(result.object_bounds, BoundingBox::new(1, 2, 1, 2).unwrap());
        assert_eq!(result.object.dimensions(), (2, 2));

        // Zero-valued border pixels touch all four extremes, so the hole
        // keeps the full frame with the center punched transparent.
        assert_eq!(result.hole_bounds, BoundingBox::new(0, 3, 0, 3).unwrap());
        assert_eq!(result.hole.dimensions(), (4, 4));
        assert_eq!(result.hole.get_pixel(1, 1)[3], 0);
        assert_eq!(result.hole.get_pixel(2, 2)[3], 0);
        assert_eq!(result.hole.get_pixel(0, 0)[3], 255);
        assert_eq!(result.hole.get_pixel(3, 3)[3], 255);

        // The object keeps the selection fully opaque.
        assert_eq!(result.object.get_pixel(0, 0)[3], 255);
        assert_eq!(result.object.get_pixel(1, 1)[3], 255);
    }

    #[test]
    fn test_all_ones_mask() {
        let image = test_image(3, 3);
        let mask = mask_from_flags(&[1; 9], (3, 3));

        let err = ImageDecomposer::decompose(&image, &mask).unwrap_err();
        assert!(matches!(err, CutoutError::EmptyBackgroundRegion));

        // The object derivative alone still succeeds, spanning the frame.
        let (object, bounds) = ImageDecomposer::decompose_object(&image, &mask).unwrap();
        assert_eq!(bounds, BoundingBox::new(0, 2, 0, 2).unwrap());
        assert_eq!(object.dimensions(), (3, 3));
    }

    #[test]
    fn test_all_zeros_mask() {
        let image = test_image(3, 3);
        let mask = mask_from_flags(&[0; 9], (3, 3));

        let err = ImageDecomposer::decompose(&image, &mask).unwrap_err();
        assert!(matches!(err, CutoutError::EmptySelection));

        // The hole derivative alone still succeeds, spanning the frame.
        let (hole, bounds) = ImageDecomposer::decompose_hole(&image, &mask).unwrap();
        assert_eq!(bounds, BoundingBox::new(0, 2, 0, 2).unwrap());
        assert_eq!(hole.dimensions(), (3, 3));
        assert_eq!(hole.get_pixel(1, 1)[3], 255);
    }

    #[test]
    fn test_full_frame_object_bounds() {
        // kept_bounds over an all-ones selection spans the whole frame.
        let selected = vec![true; 9];
        let bounds =
            ImageDecomposer::kept_bounds(&selected, (3, 3), KeepRegion::Selection).unwrap();
        assert_eq!(bounds, BoundingBox::new(0, 2, 0, 2).unwrap());

        let selected = vec![false; 9];
        let bounds =
            ImageDecomposer::kept_bounds(&selected, (3, 3), KeepRegion::Background).unwrap();
        assert_eq!(bounds, BoundingBox::new(0, 2, 0, 2).unwrap());
    }

    #[test]
    fn test_mask_dimension_mismatch_rejected() {
        let image = test_image(4, 4);
        let mask = mask_from_flags(&[1, 0, 0, 1], (2, 2));

        let err = ImageDecomposer::decompose(&image, &mask).unwrap_err();
        assert!(matches!(err, CutoutError::MaskDimensionMismatch { .. }));
    }

    #[test]
    fn test_source_image_unmodified() {
        let image = test_image(4, 4);
        let before = image.to_rgba8();
        #[rustfmt::skip]
        let mask = mask_from_flags(
            &[
                0, 0, 0, 0,
                0, 1, 1, 0,
                0, 1, 1, 0,
                0, 0, 0, 0,
            ],
            (4, 4),
        );

        let _ = ImageDecomposer::decompose(&image, &mask).unwrap();
        assert_eq!(image.to_rgba8().as_raw(), before.as_raw());
    }

    #[test]
    fn test_rgb_source_gains_opaque_alpha() {
        let mut rgb = image::RgbImage::new(3, 3);
        for (x, _, pixel) in rgb.enumerate_pixels_mut() {
            *pixel = image::Rgb([(x * 80) as u8, 10, 20]);
        }
        let image = DynamicImage::ImageRgb8(rgb);
        #[rustfmt::skip]
        let mask = mask_from_flags(
            &[
                1, 0, 0,
                0, 0, 0,
                0, 0, 0,
            ],
            (3, 3),
        );

        let result = ImageDecomposer::decompose(&image, &mask).unwrap();

        // Hole keeps the full frame; the single selected pixel is punched.
        assert_eq!(result.hole.dimensions(), (3, 3));
        assert_eq!(result.hole.get_pixel(0, 0)[3], 0);
        assert_eq!(result.hole.get_pixel(1, 0)[3], 255);

        // Object is the single selected pixel at full opacity.
        assert_eq!(result.object.dimensions(), (1, 1));
        assert_eq!(result.object.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_binarize_threshold_is_strict() {
        let mask = Mask::new(vec![0.5, 0.50001, 0.0, 1.0], (2, 2)).unwrap();
        let flags = ImageDecomposer::binarize(&mask);
        assert_eq!(flags, vec![false, true, false, true]);
    }

    #[test]
    fn test_derivative_bounds_are_independent() {
        // Selection in the top-left corner: object crops tight, hole spans
        // the frame because unselected pixels reach every edge.
        let image = test_image(5, 5);
        #[rustfmt::skip]
        let mask = mask_from_flags(
            &[
                1, 1, 0, 0, 0,
                1, 1, 0, 0, 0,
                0, 0, 0, 0, 0,
                0, 0, 0, 0, 0,
                0, 0, 0, 0, 0,
            ],
            (5, 5),
        );

        let result = ImageDecomposer::decompose(&image, &mask).unwrap();
        assert_eq!(result.object_bounds, BoundingBox::new(0, 1, 0, 1).unwrap());
        assert_eq!(result.hole_bounds, BoundingBox::new(0, 4, 0, 4).unwrap());
    }
}
