//! Keyboard shortcuts for the annotation session.
//!
//! One dispatcher keyed by the draw-machine state, so navigation and
//! the digit accelerators can never diverge: digits mean quick
//! class-select only while a box is pending, arrows navigate only while
//! nothing is pending.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    PrevImage,
    NextImage,
    CancelPending,
    DeleteLast,
    /// 1-based position into the dataset's assigned class list.
    QuickSelect(usize),
}

/// Map a pressed key to an action given whether classification is
/// pending. Returns `None` for keys with no meaning in that state.
pub fn map_key(key: egui::Key, pending: bool) -> Option<Action> {
    use egui::Key;

    if pending {
        return match key {
            Key::Escape => Some(Action::CancelPending),
            Key::Num1 => Some(Action::QuickSelect(1)),
            Key::Num2 => Some(Action::QuickSelect(2)),
            Key::Num3 => Some(Action::QuickSelect(3)),
            Key::Num4 => Some(Action::QuickSelect(4)),
            Key::Num5 => Some(Action::QuickSelect(5)),
            Key::Num6 => Some(Action::QuickSelect(6)),
            Key::Num7 => Some(Action::QuickSelect(7)),
            Key::Num8 => Some(Action::QuickSelect(8)),
            Key::Num9 => Some(Action::QuickSelect(9)),
            _ => None,
        };
    }

    match key {
        Key::ArrowLeft => Some(Action::PrevImage),
        Key::ArrowRight => Some(Action::NextImage),
        Key::Delete => Some(Action::DeleteLast),
        _ => None,
    }
}

/// Collect the actions for all keys pressed this frame.
pub fn pressed_actions(input: &egui::InputState, pending: bool) -> Vec<Action> {
    input
        .events
        .iter()
        .filter_map(|event| match event {
            egui::Event::Key {
                key, pressed: true, ..
            } => map_key(*key, pending),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Key;

    #[test]
    fn arrows_navigate_only_while_nothing_is_pending() {
        assert_eq!(map_key(Key::ArrowLeft, false), Some(Action::PrevImage));
        assert_eq!(map_key(Key::ArrowRight, false), Some(Action::NextImage));
        assert_eq!(map_key(Key::ArrowLeft, true), None);
        assert_eq!(map_key(Key::ArrowRight, true), None);
    }

    #[test]
    fn escape_cancels_only_a_pending_box() {
        assert_eq!(map_key(Key::Escape, true), Some(Action::CancelPending));
        assert_eq!(map_key(Key::Escape, false), None);
    }

    #[test]
    fn delete_is_disabled_during_classification() {
        assert_eq!(map_key(Key::Delete, false), Some(Action::DeleteLast));
        assert_eq!(map_key(Key::Delete, true), None);
    }

    #[test]
    fn digits_quick_select_positionally_while_pending() {
        assert_eq!(map_key(Key::Num1, true), Some(Action::QuickSelect(1)));
        assert_eq!(map_key(Key::Num9, true), Some(Action::QuickSelect(9)));
        assert_eq!(map_key(Key::Num5, false), None);
    }

    #[test]
    fn unrelated_keys_are_noops_in_both_states() {
        for pending in [false, true] {
            assert_eq!(map_key(Key::A, pending), None);
            assert_eq!(map_key(Key::Space, pending), None);
            assert_eq!(map_key(Key::Num0, pending), None);
        }
    }
}
