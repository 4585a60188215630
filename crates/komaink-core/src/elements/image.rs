//! Raster image style and the drag-drop payload that creates images.

use serde::{Deserialize, Serialize};

/// Where an image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSourceType {
    #[default]
    Gallery,
    Upload,
    Generated,
    Url,
}

/// How the bitmap maps onto the element rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFit {
    /// Stretch to exactly the element rectangle.
    #[default]
    Fill,
    /// Keep aspect ratio inside the rectangle.
    Contain,
}

/// A raster image placed on the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStyle {
    /// URL, file path or `data:` URL of the bitmap.
    pub url: String,
    pub original_width: u32,
    pub original_height: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source_type: ImageSourceType,
    #[serde(default)]
    pub fit: ImageFit,
}

impl ImageStyle {
    /// Build from a drop payload.
    pub fn from_payload(payload: &DropPayload) -> Self {
        Self {
            url: payload.image_url.clone(),
            original_width: payload.metadata.original_width,
            original_height: payload.metadata.original_height,
            name: payload.metadata.name.clone(),
            source_type: payload.metadata.source_type,
            fit: ImageFit::Fill,
        }
    }
}

/// Drag-drop payload handed to the editor by the asset gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropPayload {
    pub image_url: String,
    pub metadata: DropMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropMetadata {
    pub original_width: u32,
    pub original_height: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source_type: ImageSourceType,
}

impl DropPayload {
    pub fn new(image_url: impl Into<String>, original_width: u32, original_height: u32) -> Self {
        Self {
            image_url: image_url.into(),
            metadata: DropMetadata {
                original_width,
                original_height,
                ..DropMetadata::default()
            },
        }
    }

    /// Parse the JSON form used by drag-drop data transfers.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_contract() {
        let json = r#"{
            "imageUrl": "https://example.com/a.png",
            "metadata": { "originalWidth": 640, "originalHeight": 480, "name": "hero", "sourceType": "upload" }
        }"#;
        let payload = DropPayload::from_json(json).unwrap();
        assert_eq!(payload.metadata.original_width, 640);
        assert_eq!(payload.metadata.source_type, ImageSourceType::Upload);

        let style = ImageStyle::from_payload(&payload);
        assert_eq!(style.url, "https://example.com/a.png");
        assert_eq!(style.name, "hero");
    }
}
