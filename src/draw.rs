//! Lifecycle of a box from first pointer-down to commit or cancellation.
//!
//! The machine is an explicit enum so illegal transitions cannot be
//! represented: a pointer-down only matters in `Idle`, pointer motion
//! only in `Drawing`, and classification input only in `PendingClass`.
//! Anything else is a silent no-op. All coordinates are canvas-local
//! pixels; normalization happens once, at pointer-up.

use crate::geometry::NormalizedBox;

#[derive(Clone, Debug, PartialEq)]
pub enum DrawState {
    /// No active interaction.
    Idle,
    /// Rubber-banding a rectangle anchored at `start`.
    Drawing { start: egui::Pos2, current: egui::Pos2 },
    /// Box frozen, waiting for a class. Keeps the pixel rectangle for
    /// rendering and the normalized box for the eventual commit.
    PendingClass {
        pixel: egui::Rect,
        boxn: NormalizedBox,
    },
}

impl DrawState {
    pub fn new() -> Self {
        DrawState::Idle
    }

    /// Begin a new box. Only valid from `Idle`; in particular, a commit
    /// still waiting for server acknowledgement keeps the machine in
    /// `PendingClass` and blocks new boxes.
    pub fn pointer_down(&mut self, pos: egui::Pos2) {
        if matches!(self, DrawState::Idle) {
            *self = DrawState::Drawing {
                start: pos,
                current: pos,
            };
        }
    }

    /// Track the pointer while drawing. The rendered rectangle is the
    /// min/max envelope of start and current, so dragging in any of the
    /// four directions works.
    pub fn pointer_moved(&mut self, pos: egui::Pos2) {
        if let DrawState::Drawing { current, .. } = self {
            *current = pos;
        }
    }

    /// Finish the drag. Boxes below the minimum normalized size are
    /// discarded without opening the class picker.
    pub fn pointer_up(&mut self, canvas_w: f32, canvas_h: f32) {
        if let DrawState::Drawing { start, current } = *self {
            let pixel = egui::Rect::from_two_pos(start, current);
            let boxn = NormalizedBox::from_pixel_rect(pixel, canvas_w, canvas_h);
            *self = if boxn.below_min_size() {
                DrawState::Idle
            } else {
                DrawState::PendingClass { pixel, boxn }
            };
        }
    }

    /// Discard a pending box (Escape or the picker's cancel button).
    pub fn cancel(&mut self) {
        if matches!(self, DrawState::PendingClass { .. }) {
            *self = DrawState::Idle;
        }
    }

    /// Release the pending box after the store confirms the commit.
    pub fn complete(&mut self) {
        if matches!(self, DrawState::PendingClass { .. }) {
            *self = DrawState::Idle;
        }
    }

    /// Drop any interaction, pending or not. Used when the operator
    /// switches images.
    pub fn reset(&mut self) {
        *self = DrawState::Idle;
    }

    /// The rectangle to render this frame, if any.
    pub fn preview_rect(&self) -> Option<egui::Rect> {
        match self {
            DrawState::Idle => None,
            DrawState::Drawing { start, current } => {
                Some(egui::Rect::from_two_pos(*start, *current))
            }
            DrawState::PendingClass { pixel, .. } => Some(*pixel),
        }
    }

    /// The frozen box waiting for a class, if classification is pending.
    pub fn pending_box(&self) -> Option<NormalizedBox> {
        match self {
            DrawState::PendingClass { boxn, .. } => Some(*boxn),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, DrawState::PendingClass { .. })
    }
}

impl Default for DrawState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f32 = 600.0;
    const H: f32 = 400.0;

    fn drawn(from: (f32, f32), to: (f32, f32)) -> DrawState {
        let mut state = DrawState::new();
        state.pointer_down(egui::pos2(from.0, from.1));
        state.pointer_moved(egui::pos2(to.0, to.1));
        state.pointer_up(W, H);
        state
    }

    #[test]
    fn full_draw_reaches_pending_classification() {
        let state = drawn((100.0, 100.0), (300.0, 200.0));
        let boxn = state.pending_box().expect("box should be pending");
        assert!((boxn.x_center - 1.0 / 3.0).abs() < 1e-4);
        assert!((boxn.height - 0.25).abs() < 1e-4);
    }

    #[test]
    fn reverse_drag_normalizes_corners() {
        // Drag up-left: same envelope as the forward drag.
        let forward = drawn((100.0, 100.0), (300.0, 200.0));
        let backward = drawn((300.0, 200.0), (100.0, 100.0));
        assert_eq!(forward.pending_box(), backward.pending_box());
    }

    #[test]
    fn accidental_click_drag_is_discarded() {
        // 3x2 pixels on a 600x400 canvas is far below the 1% threshold.
        let state = drawn((100.0, 100.0), (103.0, 102.0));
        assert_eq!(state, DrawState::Idle);
    }

    #[test]
    fn pointer_down_is_ignored_while_pending() {
        let mut state = drawn((100.0, 100.0), (300.0, 200.0));
        let frozen = state.clone();
        state.pointer_down(egui::pos2(10.0, 10.0));
        state.pointer_moved(egui::pos2(50.0, 50.0));
        assert_eq!(state, frozen);
    }

    #[test]
    fn stray_events_in_idle_are_noops() {
        let mut state = DrawState::new();
        state.pointer_moved(egui::pos2(5.0, 5.0));
        state.pointer_up(W, H);
        state.cancel();
        state.complete();
        assert_eq!(state, DrawState::Idle);
    }

    #[test]
    fn cancel_discards_pending_box() {
        let mut state = drawn((100.0, 100.0), (300.0, 200.0));
        state.cancel();
        assert_eq!(state, DrawState::Idle);
        assert!(state.pending_box().is_none());
    }

    #[test]
    fn complete_releases_pending_box() {
        let mut state = drawn((100.0, 100.0), (300.0, 200.0));
        state.complete();
        assert_eq!(state, DrawState::Idle);
    }
}
