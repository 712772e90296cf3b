//! Resize and crop geometry.
//!
//! Pure functions; no pixels touched here. Invalid inputs are caller errors
//! and come back as [`ProcessError::Geometry`] instead of being clamped.

use serde::{Deserialize, Serialize};
use shrinkray_core::ProcessError;

/// A crop rectangle within a source image.
///
/// Invariant: `x + width <= source width` and `y + height <= source height`
/// for the source the region was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Scale `(width, height)` to fit within `long_edge`, preserving aspect
/// ratio. Images already within the bound pass through unchanged; this never
/// upscales.
pub fn fit_size(width: u32, height: u32, long_edge: u32) -> Result<(u32, u32), ProcessError> {
    if width == 0 || height == 0 {
        return Err(ProcessError::Geometry(format!(
            "source has zero area ({}x{})",
            width, height
        )));
    }
    if long_edge == 0 {
        return Err(ProcessError::Geometry("target size is 0".to_string()));
    }

    if width <= long_edge && height <= long_edge {
        return Ok((width, height));
    }

    let aspect = width as f64 / height as f64;
    if aspect > 1.0 {
        // Landscape: width is the long edge. Squares fall through to the
        // height branch, which yields the same result.
        let new_height = (long_edge as f64 / aspect).round() as u32;
        Ok((long_edge, new_height.max(1)))
    } else {
        let new_width = (long_edge as f64 * aspect).round() as u32;
        Ok((new_width.max(1), long_edge))
    }
}

/// Largest centered region of `(width, height)` matching `aspect`.
///
/// Sources wider than the target aspect keep full height and trim left/right
/// equally; otherwise full width with top/bottom trimmed.
pub fn center_crop(
    width: u32,
    height: u32,
    aspect: (u32, u32),
) -> Result<CropRegion, ProcessError> {
    if width == 0 || height == 0 {
        return Err(ProcessError::Geometry(format!(
            "source has zero area ({}x{})",
            width, height
        )));
    }
    let (aspect_w, aspect_h) = aspect;
    if aspect_w == 0 || aspect_h == 0 {
        return Err(ProcessError::Geometry(format!(
            "invalid aspect ratio {}:{}",
            aspect_w, aspect_h
        )));
    }

    let source_aspect = width as f64 / height as f64;
    let target_aspect = aspect_w as f64 / aspect_h as f64;

    let region = if source_aspect > target_aspect {
        let crop_height = height;
        let crop_width = ((height as f64 * target_aspect).round() as u32).min(width);
        CropRegion {
            x: ((width - crop_width) as f64 / 2.0).round() as u32,
            y: 0,
            width: crop_width.max(1),
            height: crop_height,
        }
    } else {
        let crop_width = width;
        let crop_height = ((width as f64 / target_aspect).round() as u32).min(height);
        CropRegion {
            x: 0,
            y: ((height - crop_height) as f64 / 2.0).round() as u32,
            width: crop_width,
            height: crop_height.max(1),
        }
    };

    debug_assert!(region.x + region.width <= width);
    debug_assert!(region.y + region.height <= height);

    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_size_portrait() {
        assert_eq!(fit_size(100, 200, 100).unwrap(), (50, 100));
    }

    #[test]
    fn fit_size_landscape() {
        assert_eq!(fit_size(200, 100, 100).unwrap(), (100, 50));
    }

    #[test]
    fn fit_size_never_upscales() {
        assert_eq!(fit_size(50, 50, 100).unwrap(), (50, 50));
        assert_eq!(fit_size(640, 480, 640).unwrap(), (640, 480));
    }

    #[test]
    fn fit_size_square_hits_target_exactly() {
        assert_eq!(fit_size(3000, 3000, 1280).unwrap(), (1280, 1280));
    }

    #[test]
    fn fit_size_rounds_short_edge() {
        // 1000/3000 * 640 = 213.33 -> 213
        assert_eq!(fit_size(3000, 1000, 640).unwrap(), (640, 213));
        // 2000/1500 aspect: height = 640 / (2000/1500) = 480
        assert_eq!(fit_size(2000, 1500, 640).unwrap(), (640, 480));
    }

    #[test]
    fn fit_size_preserves_aspect_within_rounding() {
        for (w, h) in [(1920, 1080), (3840, 2160), (1234, 567), (799, 1333)] {
            let (nw, nh) = fit_size(w, h, 640).unwrap();
            assert_eq!(nw.max(nh), 640);
            let expected_short =
                (640.0 * (w.min(h) as f64) / (w.max(h) as f64)).round() as i64;
            assert!((nw.min(nh) as i64 - expected_short).abs() <= 1);
        }
    }

    #[test]
    fn fit_size_extreme_ratio_keeps_short_edge_positive() {
        let (w, h) = fit_size(10000, 10, 100).unwrap();
        assert_eq!(w, 100);
        assert!(h >= 1);
    }

    #[test]
    fn fit_size_rejects_invalid_input() {
        assert!(fit_size(0, 100, 640).is_err());
        assert!(fit_size(100, 0, 640).is_err());
        assert!(fit_size(100, 100, 0).is_err());
    }

    #[test]
    fn center_crop_wider_source_trims_sides() {
        // 1000x500 to 16:9: keep height, width = round(500*16/9) = 889
        let region = center_crop(1000, 500, (16, 9)).unwrap();
        assert_eq!(region.width, 889);
        assert_eq!(region.height, 500);
        assert_eq!(region.x, 56);
        assert_eq!(region.y, 0);
    }

    #[test]
    fn center_crop_taller_source_trims_top_and_bottom() {
        // 500x1000 to 16:9: keep width, height = round(500*9/16) = 281
        let region = center_crop(500, 1000, (16, 9)).unwrap();
        assert_eq!(region.width, 500);
        assert_eq!(region.height, 281);
        assert_eq!(region.x, 0);
        assert_eq!(region.y, 360);
    }

    #[test]
    fn center_crop_square_on_square_is_identity() {
        let region = center_crop(2000, 2000, (1, 1)).unwrap();
        assert_eq!(
            region,
            CropRegion {
                x: 0,
                y: 0,
                width: 2000,
                height: 2000
            }
        );
    }

    #[test]
    fn center_crop_stays_within_bounds() {
        for (w, h) in [(1000, 500), (333, 777), (1920, 1080), (7, 5)] {
            for aspect in [(16, 9), (4, 3), (1, 1), (9, 16)] {
                let region = center_crop(w, h, aspect).unwrap();
                assert!(region.x + region.width <= w, "{}x{} {:?}", w, h, aspect);
                assert!(region.y + region.height <= h, "{}x{} {:?}", w, h, aspect);
                let got = region.width as f64 / region.height as f64;
                let want = aspect.0 as f64 / aspect.1 as f64;
                // Rounding tolerance scales with the shorter crop edge.
                let tolerance = 1.0 / region.height.min(region.width) as f64 + 0.02;
                assert!(
                    (got / want - 1.0).abs() < tolerance.max(0.05),
                    "{}x{} {:?} -> {:?}",
                    w,
                    h,
                    aspect,
                    region
                );
            }
        }
    }

    #[test]
    fn center_crop_rejects_invalid_input() {
        assert!(center_crop(0, 100, (16, 9)).is_err());
        assert!(center_crop(100, 0, (16, 9)).is_err());
        assert!(center_crop(100, 100, (0, 9)).is_err());
        assert!(center_crop(100, 100, (16, 0)).is_err());
    }
}
