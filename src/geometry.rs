//! Coordinate codec between canvas pixel space and normalized box space.
//!
//! Stored boxes are resolution-independent: center and size expressed as
//! fractions of the image dimensions. Pixel rectangles only exist for
//! rendering against whatever size the canvas happens to be this frame.

use serde::{Deserialize, Serialize};

/// Boxes with a normalized width or height below this are treated as
/// accidental click-drags and discarded before classification.
pub const MIN_BOX_DIM: f32 = 0.01;

/// A bounding box as stored and trained on: `{x_center, y_center, width,
/// height}`, each a fraction of the image's dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedBox {
    /// Normalize a canvas-local pixel rectangle against the canvas size.
    /// The canvas dimensions must be positive.
    pub fn from_pixel_rect(rect: egui::Rect, canvas_w: f32, canvas_h: f32) -> Self {
        debug_assert!(canvas_w > 0.0 && canvas_h > 0.0);
        Self {
            x_center: rect.center().x / canvas_w,
            y_center: rect.center().y / canvas_h,
            width: rect.width() / canvas_w,
            height: rect.height() / canvas_h,
        }
    }

    /// Project back onto a canvas of the given size. Inverse of
    /// [`NormalizedBox::from_pixel_rect`] for the same dimensions; must be
    /// re-applied whenever the canvas is resized.
    pub fn to_pixel_rect(&self, canvas_w: f32, canvas_h: f32) -> egui::Rect {
        let w = self.width * canvas_w;
        let h = self.height * canvas_h;
        egui::Rect::from_min_size(
            egui::pos2(
                self.x_center * canvas_w - w / 2.0,
                self.y_center * canvas_h - h / 2.0,
            ),
            egui::vec2(w, h),
        )
    }

    pub fn below_min_size(&self) -> bool {
        self.width < MIN_BOX_DIM || self.height < MIN_BOX_DIM
    }
}

/// Largest size that fits `avail` while preserving the aspect ratio of
/// `native`, never upscaling beyond native resolution.
pub fn fit_within(native: egui::Vec2, avail: egui::Vec2) -> egui::Vec2 {
    let scale = (avail.x / native.x).min(avail.y / native.y).min(1.0);
    native * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn pixel_normalized_round_trip() {
        let rect = egui::Rect::from_min_max(egui::pos2(37.5, 12.25), egui::pos2(412.0, 230.5));
        for &(w, h) in &[(640.0, 480.0), (1234.0, 777.0), (500.5, 499.5)] {
            let back = NormalizedBox::from_pixel_rect(rect, w, h).to_pixel_rect(w, h);
            assert!(approx(back.min.x, rect.min.x), "{w}x{h}");
            assert!(approx(back.min.y, rect.min.y));
            assert!(approx(back.max.x, rect.max.x));
            assert!(approx(back.max.y, rect.max.y));
        }
    }

    #[test]
    fn drag_scenario_matches_expected_yolo_coords() {
        // Drag (100,100) -> (300,200) on a 600x400 canvas.
        let rect = egui::Rect::from_two_pos(egui::pos2(100.0, 100.0), egui::pos2(300.0, 200.0));
        let boxn = NormalizedBox::from_pixel_rect(rect, 600.0, 400.0);
        assert!(approx(boxn.x_center, 1.0 / 3.0));
        assert!(approx(boxn.y_center, 0.375));
        assert!(approx(boxn.width, 1.0 / 3.0));
        assert!(approx(boxn.height, 0.25));
    }

    #[test]
    fn min_size_threshold() {
        let tiny = NormalizedBox {
            x_center: 0.5,
            y_center: 0.5,
            width: 0.009,
            height: 0.5,
        };
        assert!(tiny.below_min_size());

        let ok = NormalizedBox {
            width: 0.01,
            height: 0.01,
            ..tiny
        };
        assert!(!ok.below_min_size());
    }

    #[test]
    fn fit_preserves_aspect_and_never_upscales() {
        // Wide image into a tall area: width binds.
        let fitted = fit_within(egui::vec2(1200.0, 800.0), egui::vec2(600.0, 700.0));
        assert!(approx(fitted.x, 600.0));
        assert!(approx(fitted.y, 400.0));

        // Smaller than available: keep native size.
        let fitted = fit_within(egui::vec2(320.0, 240.0), egui::vec2(1000.0, 1000.0));
        assert!(approx(fitted.x, 320.0));
        assert!(approx(fitted.y, 240.0));

        // Height binds.
        let fitted = fit_within(egui::vec2(800.0, 1600.0), egui::vec2(800.0, 400.0));
        assert!(approx(fitted.x, 200.0));
        assert!(approx(fitted.y, 400.0));
    }
}
