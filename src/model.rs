//! Wire types shared with the weld-inspection backend.
//!
//! Field names mirror the JSON the REST API produces and consumes, so
//! every type here derives straight through serde without renames
//! beyond the lowercase `split` tag.

use serde::{Deserialize, Serialize};

use crate::geometry::NormalizedBox;

/// Train/valid/test partition tag attached to an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    #[default]
    Unassigned,
    Train,
    Valid,
    Test,
}

impl Split {
    pub const ALL: [Split; 4] = [Split::Unassigned, Split::Train, Split::Valid, Split::Test];

    pub fn label(self) -> &'static str {
        match self {
            Split::Unassigned => "unassigned",
            Split::Train => "train",
            Split::Valid => "valid",
            Split::Test => "test",
        }
    }
}

/// One picture belonging to a dataset.
#[derive(Clone, Debug, Deserialize)]
pub struct LabeledImage {
    pub id: i64,
    pub image_url: String,
    pub filename: String,
    #[serde(default)]
    pub split: Split,
    #[serde(default)]
    pub annotation_count: u32,
}

/// A committed, server-persisted bounding box on one image.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Annotation {
    pub id: i64,
    pub image: i64,
    pub class_name: String,
    #[serde(flatten)]
    pub boxn: NormalizedBox,
}

/// Create payload for the annotation service; the server assigns the id.
#[derive(Clone, Debug, Serialize)]
pub struct NewAnnotation {
    pub image: i64,
    pub class_name: String,
    #[serde(flatten)]
    pub boxn: NormalizedBox,
}

/// A defect class from the taxonomy service. Read-only here.
#[derive(Clone, Debug, Deserialize)]
pub struct DefectClass {
    pub name: String,
    pub display_name: String,
    pub color: String,
    #[serde(default)]
    pub description: String,
}

impl DefectClass {
    /// Parse the `#rrggbb` color string, falling back to neutral gray
    /// for malformed values so rendering never fails on bad taxonomy data.
    pub fn color32(&self) -> egui::Color32 {
        parse_hex_color(&self.color).unwrap_or(egui::Color32::from_rgb(0x6b, 0x72, 0x80))
    }
}

/// Dataset header: assigned classes plus the configured split ratios.
#[derive(Clone, Debug, Deserialize)]
pub struct Dataset {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub classes: Vec<DefectClass>,
    #[serde(default = "default_train_split")]
    pub train_split: u8,
    #[serde(default = "default_minor_split")]
    pub valid_split: u8,
    #[serde(default = "default_minor_split")]
    pub test_split: u8,
}

fn default_train_split() -> u8 {
    80
}

fn default_minor_split() -> u8 {
    10
}

impl Dataset {
    pub fn class_by_name(&self, name: &str) -> Option<&DefectClass> {
        self.classes.iter().find(|c| c.name == name)
    }
}

/// Per-chunk response of the image service's batch upload endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct BatchUploadResult {
    pub uploaded: usize,
    #[serde(default)]
    pub errors: Vec<String>,
}

fn parse_hex_color(hex: &str) -> Option<egui::Color32> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(egui::Color32::from_rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_round_trips_as_lowercase() {
        let json = serde_json::to_string(&Split::Train).unwrap();
        assert_eq!(json, "\"train\"");
        let back: Split = serde_json::from_str("\"unassigned\"").unwrap();
        assert_eq!(back, Split::Unassigned);
    }

    #[test]
    fn annotation_box_is_flattened_on_the_wire() {
        let ann: Annotation = serde_json::from_str(
            r#"{"id":7,"image":3,"class_name":"porosity",
                "x_center":0.5,"y_center":0.5,"width":0.2,"height":0.1}"#,
        )
        .unwrap();
        assert_eq!(ann.boxn.width, 0.2);

        let new = NewAnnotation {
            image: 3,
            class_name: "crack".into(),
            boxn: ann.boxn,
        };
        let value = serde_json::to_value(&new).unwrap();
        assert_eq!(value["x_center"], 0.5);
        assert_eq!(value["class_name"], "crack");
    }

    #[test]
    fn hex_colors_parse_with_gray_fallback() {
        assert_eq!(
            parse_hex_color("#ef4444"),
            Some(egui::Color32::from_rgb(0xef, 0x44, 0x44))
        );
        assert_eq!(parse_hex_color("ef4444"), None);
        assert_eq!(parse_hex_color("#zzz"), None);

        let cls = DefectClass {
            name: "spatter".into(),
            display_name: "Spatter".into(),
            color: "not-a-color".into(),
            description: String::new(),
        };
        assert_eq!(cls.color32(), egui::Color32::from_rgb(0x6b, 0x72, 0x80));
    }

    #[test]
    fn image_defaults_apply_when_fields_missing() {
        let img: LabeledImage = serde_json::from_str(
            r#"{"id":1,"image_url":"/media/w1.png","filename":"w1.png"}"#,
        )
        .unwrap();
        assert_eq!(img.split, Split::Unassigned);
        assert_eq!(img.annotation_count, 0);
    }
}
