//! Painting the annotation scene onto the canvas.
//!
//! Strict order: base image, committed boxes in their class colors,
//! then the in-progress or pending box in the highlight color. Pure
//! projection of the store and the draw machine; nothing here mutates
//! state, so the canvas can always repaint with last-known-good data.

use crate::draw::DrawState;
use crate::model::{Annotation, Dataset};

/// Highlight for the box being drawn or awaiting a class. Yellow is
/// reserved: class colors come from the taxonomy and the picker forbids it.
const HIGHLIGHT: egui::Color32 = egui::Color32::from_rgb(255, 255, 0);
const HIGHLIGHT_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(40, 40, 0, 40);

const BOX_STROKE: f32 = 2.0;
const PENDING_STROKE: f32 = 3.0;
const LABEL_FONT: f32 = 12.0;

pub fn paint_scene(
    painter: &egui::Painter,
    canvas: egui::Rect,
    texture: Option<&egui::TextureHandle>,
    annotations: &[Annotation],
    dataset: Option<&Dataset>,
    draw: &DrawState,
) {
    if let Some(tex) = texture {
        painter.image(
            tex.id(),
            canvas,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
    }

    for ann in annotations {
        let (color, label) = match dataset.and_then(|d| d.class_by_name(&ann.class_name)) {
            Some(cls) => (cls.color32(), cls.display_name.clone()),
            None => (egui::Color32::from_rgb(0x6b, 0x72, 0x80), ann.class_name.clone()),
        };
        let rect = ann
            .boxn
            .to_pixel_rect(canvas.width(), canvas.height())
            .translate(canvas.min.to_vec2());

        painter.rect_stroke(
            rect,
            0.0,
            egui::Stroke::new(BOX_STROKE, color),
            egui::StrokeKind::Middle,
        );
        painter.rect_filled(rect, 0.0, color.gamma_multiply(0.2));
        paint_label_chip(painter, rect.min, &label, color, egui::Color32::WHITE);
    }

    if let Some(rect) = draw.preview_rect() {
        let rect = rect.translate(canvas.min.to_vec2());
        painter.rect_stroke(
            rect,
            0.0,
            egui::Stroke::new(PENDING_STROKE, HIGHLIGHT),
            egui::StrokeKind::Middle,
        );
        painter.rect_filled(rect, 0.0, HIGHLIGHT_FILL);
        if draw.is_pending() {
            paint_label_chip(
                painter,
                rect.min,
                "select class (1-9)",
                HIGHLIGHT,
                egui::Color32::BLACK,
            );
        }
    }
}

/// Small filled tag above a box's top-left corner carrying its label.
fn paint_label_chip(
    painter: &egui::Painter,
    anchor: egui::Pos2,
    label: &str,
    background: egui::Color32,
    text_color: egui::Color32,
) {
    let galley = painter.layout_no_wrap(
        label.to_string(),
        egui::FontId::proportional(LABEL_FONT),
        text_color,
    );
    let padding = egui::vec2(5.0, 3.0);
    let chip = egui::Rect::from_min_size(
        anchor - egui::vec2(0.0, galley.size().y + padding.y * 2.0),
        galley.size() + padding * 2.0,
    );
    painter.rect_filled(chip, 2.0, background);
    painter.galley(chip.min + padding, galley, text_color);
}
