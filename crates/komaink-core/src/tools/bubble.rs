//! Dialogue and text creation.

use crate::config::EditorConfig;
use crate::elements::{BubbleType, DialogueStyle, Element, Metadata, TextStyle};
use kurbo::{Point, Rect, Size};
use uuid::Uuid;

/// A default-sized, empty bubble of `bubble_type` centered on `at`.
pub fn bubble_element(config: &EditorConfig, at: Point, bubble_type: BubbleType, z_index: i64) -> Element {
    let rect = Rect::from_center_size(at, Size::new(config.default_bubble_width, config.default_bubble_height));
    Element::dialogue(Uuid::nil(), rect, DialogueStyle::new(bubble_type))
        .with_z(z_index)
        .with_metadata(Metadata {
            created_by: Some("dialogue_tool".to_string()),
            ..Metadata::default()
        })
}

/// A default text box centered on `at`.
pub fn text_element(config: &EditorConfig, at: Point, z_index: i64) -> Element {
    let rect = Rect::from_center_size(at, Size::new(config.default_text_width, config.default_text_height));
    Element::text(Uuid::nil(), rect, TextStyle::default())
        .with_z(z_index)
        .with_metadata(Metadata {
            created_by: Some("text_tool".to_string()),
            ..Metadata::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ElementKind, Layer};

    #[test]
    fn test_bubble_defaults() {
        let config = EditorConfig::default();
        let bubble = bubble_element(&config, Point::new(100.0, 100.0), BubbleType::Speech, 3);
        assert_eq!(bubble.layer, Layer::Dialogue);
        assert_eq!(bubble.transform.z_index, 3);
        assert!((bubble.transform.width - config.default_bubble_width).abs() < f64::EPSILON);
        match &bubble.kind {
            ElementKind::Dialogue(style) => {
                assert_eq!(style.bubble_type, BubbleType::Speech);
                assert!(style.text.is_empty());
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_text_centered() {
        let config = EditorConfig::default();
        let text = text_element(&config, Point::new(50.0, 60.0), 0);
        assert_eq!(text.bounds().center(), Point::new(50.0, 60.0));
    }
}
