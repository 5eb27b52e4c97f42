//! Authoritative in-memory list of committed annotations for the open
//! image, synchronized with the annotation persistence service.
//!
//! The list is a cache: the remote service is ground truth, ids are
//! always server-assigned, and writes are never retried automatically.
//! Each operation is split into a `begin_*` transition (validates and
//! marks the request in flight) and a `finish_*` transition (applies
//! the server's answer). The network itself happens elsewhere, which
//! keeps every transition synchronous and unit-testable.

use crate::geometry::NormalizedBox;
use crate::model::{Annotation, NewAnnotation};

#[derive(Debug, Default)]
pub struct AnnotationStore {
    image_id: Option<i64>,
    annotations: Vec<Annotation>,
    commit_in_flight: bool,
    remove_in_flight: Option<i64>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed annotations in creation order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn commit_in_flight(&self) -> bool {
        self.commit_in_flight
    }

    /// Forget the open image entirely (it was deleted or deselected).
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Switch to a new image: the old list is dropped immediately so the
    /// renderer never shows another image's boxes.
    pub fn begin_load(&mut self, image_id: i64) {
        self.image_id = Some(image_id);
        self.annotations.clear();
        self.commit_in_flight = false;
        self.remove_in_flight = None;
    }

    /// Apply a fetch result. Answers for an image the operator has
    /// already navigated away from are dropped.
    pub fn finish_load(&mut self, image_id: i64, result: Result<Vec<Annotation>, String>) -> Option<String> {
        if self.image_id != Some(image_id) {
            return None;
        }
        match result {
            Ok(list) => {
                self.annotations = list;
                None
            }
            Err(err) => Some(format!("failed to load annotations: {err}")),
        }
    }

    /// Validate and stage a commit. Returns the create payload to send,
    /// or `None` when the box is below minimum size, another commit is
    /// still unacknowledged, or the image does not match.
    pub fn begin_commit(
        &mut self,
        image_id: i64,
        class_name: &str,
        boxn: NormalizedBox,
    ) -> Option<NewAnnotation> {
        if self.image_id != Some(image_id) || self.commit_in_flight || boxn.below_min_size() {
            return None;
        }
        self.commit_in_flight = true;
        Some(NewAnnotation {
            image: image_id,
            class_name: class_name.to_string(),
            boxn,
        })
    }

    /// Apply the create response. On success the server record joins the
    /// list and the caller may release the pending box; on failure the
    /// error is surfaced and the pending box must be left untouched so
    /// the operator can retry or cancel.
    pub fn finish_commit(&mut self, result: Result<Annotation, String>) -> Result<(), String> {
        self.commit_in_flight = false;
        match result {
            Ok(ann) => {
                self.annotations.push(ann);
                Ok(())
            }
            Err(err) => Err(format!("failed to save annotation: {err}")),
        }
    }

    /// Stage deletion of a specific annotation.
    pub fn begin_remove(&mut self, annotation_id: i64) -> Option<i64> {
        if self.remove_in_flight.is_some()
            || !self.annotations.iter().any(|a| a.id == annotation_id)
        {
            return None;
        }
        self.remove_in_flight = Some(annotation_id);
        Some(annotation_id)
    }

    /// Stage deletion of the most recently committed annotation
    /// (creation order, not spatial order).
    pub fn begin_remove_last(&mut self) -> Option<i64> {
        let last = self.annotations.last()?.id;
        self.begin_remove(last)
    }

    pub fn finish_remove(&mut self, annotation_id: i64, result: Result<(), String>) -> Result<(), String> {
        if self.remove_in_flight == Some(annotation_id) {
            self.remove_in_flight = None;
        }
        match result {
            Ok(()) => {
                self.annotations.retain(|a| a.id != annotation_id);
                Ok(())
            }
            Err(err) => Err(format!("failed to delete annotation: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::DrawState;

    fn boxn(width: f32, height: f32) -> NormalizedBox {
        NormalizedBox {
            x_center: 0.5,
            y_center: 0.5,
            width,
            height,
        }
    }

    fn committed(id: i64, class_name: &str) -> Annotation {
        Annotation {
            id,
            image: 1,
            class_name: class_name.to_string(),
            boxn: boxn(0.2, 0.2),
        }
    }

    fn loaded_store(annotations: Vec<Annotation>) -> AnnotationStore {
        let mut store = AnnotationStore::new();
        store.begin_load(1);
        assert!(store.finish_load(1, Ok(annotations)).is_none());
        store
    }

    #[test]
    fn load_replaces_list_and_ignores_stale_responses() {
        let mut store = AnnotationStore::new();
        store.begin_load(1);
        // Operator navigated on before the fetch for image 1 answered.
        store.begin_load(2);
        assert!(store.finish_load(1, Ok(vec![committed(9, "crack")])).is_none());
        assert!(store.annotations().is_empty());

        assert!(store.finish_load(2, Ok(vec![committed(3, "porosity")])).is_none());
        assert_eq!(store.annotations().len(), 1);
    }

    #[test]
    fn undersized_box_never_reaches_the_service() {
        let mut store = loaded_store(vec![]);
        assert!(store.begin_commit(1, "porosity", boxn(0.009, 0.5)).is_none());
        assert!(!store.commit_in_flight());
    }

    #[test]
    fn only_one_commit_in_flight() {
        let mut store = loaded_store(vec![]);
        assert!(store.begin_commit(1, "porosity", boxn(0.2, 0.2)).is_some());
        assert!(store.begin_commit(1, "crack", boxn(0.2, 0.2)).is_none());
    }

    #[test]
    fn successful_commit_appends_server_record() {
        let mut store = loaded_store(vec![]);
        let payload = store.begin_commit(1, "porosity", boxn(0.2, 0.2)).unwrap();
        assert_eq!(payload.class_name, "porosity");

        store.finish_commit(Ok(committed(42, "porosity"))).unwrap();
        assert_eq!(store.annotations().len(), 1);
        assert_eq!(store.annotations()[0].id, 42);
        assert!(!store.commit_in_flight());
    }

    #[test]
    fn failed_commit_preserves_pending_box_for_retry() {
        let mut draw = DrawState::new();
        draw.pointer_down(egui::pos2(100.0, 100.0));
        draw.pointer_moved(egui::pos2(300.0, 200.0));
        draw.pointer_up(600.0, 400.0);
        let pending = draw.pending_box().unwrap();

        let mut store = loaded_store(vec![]);
        store.begin_commit(1, "porosity", pending).unwrap();
        let err = store
            .finish_commit(Err("connection refused".into()))
            .unwrap_err();
        assert!(err.contains("connection refused"));

        // Nothing was appended, the box is still pending and unchanged,
        // and the operator may retry.
        assert!(store.annotations().is_empty());
        assert_eq!(draw.pending_box(), Some(pending));
        assert!(store.begin_commit(1, "porosity", pending).is_some());
    }

    #[test]
    fn remove_last_targets_creation_order() {
        let mut store = loaded_store(vec![
            committed(1, "a"),
            committed(2, "b"),
            committed(3, "c"),
        ]);
        let id = store.begin_remove_last().unwrap();
        assert_eq!(id, 3);
        store.finish_remove(3, Ok(())).unwrap();

        let left: Vec<i64> = store.annotations().iter().map(|a| a.id).collect();
        assert_eq!(left, vec![1, 2]);
    }

    #[test]
    fn failed_remove_keeps_the_entry() {
        let mut store = loaded_store(vec![committed(1, "a")]);
        store.begin_remove(1).unwrap();
        assert!(store.finish_remove(1, Err("timeout".into())).is_err());
        assert_eq!(store.annotations().len(), 1);
        // The slot is free again for an explicit retry.
        assert!(store.begin_remove(1).is_some());
    }

    #[test]
    fn remove_of_unknown_id_is_refused() {
        let mut store = loaded_store(vec![committed(1, "a")]);
        assert!(store.begin_remove(99).is_none());
        assert!(store.begin_remove_last().is_some());
    }
}
