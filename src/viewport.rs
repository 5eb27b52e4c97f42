//! Image loading and scale-to-fit for the annotation canvas.
//!
//! Fetching and decoding happen on a worker thread; this type only
//! tracks the outcome and owns the GPU texture. A load failure leaves
//! the canvas blank with a message, never a crash: the operator can
//! still navigate away.

use crate::geometry;

pub enum Viewport {
    Empty,
    Loading {
        image_id: i64,
    },
    Ready {
        rgba: image::RgbaImage,
        texture: Option<egui::TextureHandle>,
    },
    Failed {
        message: String,
    },
}

impl Viewport {
    pub fn new() -> Self {
        Viewport::Empty
    }

    pub fn begin_load(&mut self, image_id: i64) {
        *self = Viewport::Loading { image_id };
    }

    /// Apply a fetch+decode result. Results for an image the operator
    /// has already navigated away from are dropped.
    pub fn finish_load(&mut self, for_image: i64, result: Result<image::RgbaImage, String>) {
        let current = match self {
            Viewport::Loading { image_id } => *image_id,
            _ => return,
        };
        if current != for_image {
            return;
        }
        *self = match result {
            Ok(rgba) => Viewport::Ready {
                rgba,
                texture: None,
            },
            Err(message) => Viewport::Failed { message },
        };
    }

    /// Native pixel dimensions of the decoded image.
    pub fn native_size(&self) -> Option<egui::Vec2> {
        match self {
            Viewport::Ready { rgba, .. } => {
                Some(egui::vec2(rgba.width() as f32, rgba.height() as f32))
            }
            _ => None,
        }
    }

    /// Rendered canvas size for the available space: aspect-preserving,
    /// never upscaled past native resolution.
    pub fn canvas_size(&self, avail: egui::Vec2) -> Option<egui::Vec2> {
        self.native_size().map(|native| geometry::fit_within(native, avail))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Viewport::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Viewport::Loading { .. })
    }

    /// Upload the decoded image to the GPU on first use and return the
    /// texture for painting.
    pub fn texture(&mut self, ctx: &egui::Context) -> Option<&egui::TextureHandle> {
        if let Viewport::Ready { rgba, texture, .. } = self {
            if texture.is_none() {
                let size = [rgba.width() as usize, rgba.height() as usize];
                let pixels = rgba.as_flat_samples();
                let color_image =
                    egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
                *texture = Some(ctx.load_texture(
                    "weld-image",
                    color_image,
                    egui::TextureOptions::LINEAR,
                ));
            }
            texture.as_ref()
        } else {
            None
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode fetched bytes into RGBA, run on the worker thread.
pub fn decode_image(bytes: &[u8]) -> Result<image::RgbaImage, String> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|err| format!("could not decode image: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rgba(w: u32, h: u32) -> image::RgbaImage {
        image::RgbaImage::new(w, h)
    }

    #[test]
    fn stale_load_results_are_dropped() {
        let mut viewport = Viewport::new();
        viewport.begin_load(1);
        viewport.begin_load(2);

        viewport.finish_load(1, Ok(test_rgba(100, 50)));
        assert!(viewport.native_size().is_none());

        viewport.finish_load(2, Ok(test_rgba(1200, 800)));
        assert_eq!(viewport.native_size(), Some(egui::vec2(1200.0, 800.0)));
    }

    #[test]
    fn failure_reports_without_pixels() {
        let mut viewport = Viewport::new();
        viewport.begin_load(5);
        viewport.finish_load(5, Err("404 not found".into()));
        assert!(viewport.native_size().is_none());
        assert_eq!(viewport.error(), Some("404 not found"));
    }

    #[test]
    fn canvas_size_scales_to_fit() {
        let mut viewport = Viewport::new();
        viewport.begin_load(1);
        viewport.finish_load(1, Ok(test_rgba(1200, 800)));

        let canvas = viewport.canvas_size(egui::vec2(600.0, 700.0)).unwrap();
        assert!((canvas.x - 600.0).abs() < 1e-4);
        assert!((canvas.y - 400.0).abs() < 1e-4);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_image(b"not an image").is_err());
    }
}
