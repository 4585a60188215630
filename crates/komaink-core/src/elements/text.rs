//! Free text style.

use super::SerializableColor;
use serde::{Deserialize, Serialize};

/// Font selection shared by text and dialogue elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    pub color: SerializableColor,
    #[serde(default)]
    pub bold: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Anime Ace".to_string(),
            size: 16.0,
            color: SerializableColor::black(),
            bold: false,
        }
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Free-floating text such as captions and sound effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub content: String,
    pub font: FontSpec,
    #[serde(default)]
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            content: "Text".to_string(),
            font: FontSpec::default(),
            align: TextAlign::Center,
        }
    }
}
