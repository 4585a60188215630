//! Sprite style (reusable character/prop art from the asset library).

use super::SerializableColor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteStyle {
    /// Asset library key.
    pub asset_id: String,
    #[serde(default)]
    pub flip_x: bool,
    #[serde(default)]
    pub flip_y: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint: Option<SerializableColor>,
}
