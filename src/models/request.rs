use std::path::PathBuf;
use std::str::FromStr;

use garde::Validate;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

use crate::config::QualityPreset;

/// Vertical anchor zone of a text overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TextPosition {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Fixed overlay text palette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TextColor {
    #[default]
    White,
    Black,
    Red,
    Blue,
    Yellow,
    Green,
}

impl TextColor {
    pub fn rgb(self) -> [u8; 3] {
        match self {
            TextColor::White => [255, 255, 255],
            TextColor::Black => [0, 0, 0],
            TextColor::Red => [255, 0, 0],
            TextColor::Blue => [0, 0, 255],
            TextColor::Yellow => [255, 255, 0],
            TextColor::Green => [0, 255, 0],
        }
    }

    /// Outline color: black, or white when the text itself is black.
    pub fn outline(self) -> TextColor {
        match self {
            TextColor::Black => TextColor::White,
            _ => TextColor::Black,
        }
    }
}

/// Unknown names deserialize to the default variant instead of failing.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_default())
}

impl<'de> Deserialize<'de> for TextPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient(deserializer)
    }
}

impl<'de> Deserialize<'de> for TextColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient(deserializer)
    }
}

/// One text overlay instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TextOverlaySpec {
    #[garde(length(min = 1, max = 500))]
    pub text: String,

    /// Slide this overlay targets; `None` matches whichever slide is being built.
    #[serde(default)]
    #[garde(skip)]
    pub image_index: Option<usize>,

    #[serde(default)]
    #[garde(skip)]
    pub position: TextPosition,

    #[serde(default = "default_font_size")]
    #[garde(range(min = 1, max = 500))]
    pub font_size: u32,

    #[serde(default)]
    #[garde(skip)]
    pub color: TextColor,
}

fn default_font_size() -> u32 {
    50
}

impl TextOverlaySpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_index: None,
            position: TextPosition::default(),
            font_size: default_font_size(),
            color: TextColor::default(),
        }
    }

    pub fn applies_to(&self, slide_index: usize) -> bool {
        self.image_index.unwrap_or(slide_index) == slide_index
    }
}

/// Validated, immutable input bundle for one render.
#[derive(Debug, Clone, Validate)]
pub struct GenerationRequest {
    #[garde(length(min = 1))]
    pub upload_id: String,

    /// Directory holding the uploaded images.
    #[garde(skip)]
    pub source_dir: PathBuf,

    #[garde(dive)]
    pub text_overlays: Vec<TextOverlaySpec>,

    /// Music file name inside the music library.
    #[garde(skip)]
    pub music_file: Option<String>,

    /// Seconds each image stays on screen.
    #[garde(custom(positive_seconds))]
    pub duration_per_image: f64,

    /// Fade-in/fade-out length in seconds, 0 disables fades.
    #[garde(custom(non_negative_seconds))]
    pub transition_duration: f64,

    #[garde(skip)]
    pub quality: QualityPreset,
}

fn positive_seconds(value: &f64, _ctx: &()) -> garde::Result {
    if value.is_finite() && *value > 0.0 {
        Ok(())
    } else {
        Err(garde::Error::new("must be a positive number of seconds"))
    }
}

fn non_negative_seconds(value: &f64, _ctx: &()) -> garde::Result {
    if value.is_finite() && *value >= 0.0 {
        Ok(())
    } else {
        Err(garde::Error::new("must be zero or a positive number of seconds"))
    }
}

impl GenerationRequest {
    /// Request with the service defaults: 3s per image, 0.5s fades,
    /// high quality, no overlays and no music.
    pub fn new(upload_id: impl Into<String>, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_id: upload_id.into(),
            source_dir: source_dir.into(),
            text_overlays: Vec::new(),
            music_file: None,
            duration_per_image: 3.0,
            transition_duration: 0.5,
            quality: QualityPreset::High,
        }
    }

    /// Overlays that apply to the slide at `index`, in list order.
    pub fn overlays_for(&self, index: usize) -> Vec<&TextOverlaySpec> {
        self.text_overlays
            .iter()
            .filter(|o| o.applies_to(index))
            .collect()
    }

    /// Positions in `text_overlays` of the overlays drawn on slide `index`.
    pub fn overlay_indices_for(&self, index: usize) -> Vec<usize> {
        self.text_overlays
            .iter()
            .enumerate()
            .filter(|(_, o)| o.applies_to(index))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_defaults() {
        let overlay: TextOverlaySpec = serde_json::from_str(r#"{"text": "Hello"}"#).unwrap();
        assert_eq!(overlay.position, TextPosition::Center);
        assert_eq!(overlay.color, TextColor::White);
        assert_eq!(overlay.font_size, 50);
        assert_eq!(overlay.image_index, None);
    }

    #[test]
    fn test_unknown_names_fall_back() {
        let overlay: TextOverlaySpec = serde_json::from_str(
            r#"{"text": "Hi", "position": "sideways", "color": "magenta", "image_index": 2}"#,
        )
        .unwrap();
        assert_eq!(overlay.position, TextPosition::Center);
        assert_eq!(overlay.color, TextColor::White);
        assert_eq!(overlay.image_index, Some(2));

        let overlay: TextOverlaySpec =
            serde_json::from_str(r#"{"text": "Hi", "position": "Bottom", "color": "YELLOW"}"#)
                .unwrap();
        assert_eq!(overlay.position, TextPosition::Bottom);
        assert_eq!(overlay.color, TextColor::Yellow);
    }

    #[test]
    fn test_palette_and_outline() {
        assert_eq!(TextColor::Red.rgb(), [255, 0, 0]);
        assert_eq!(TextColor::Yellow.rgb(), [255, 255, 0]);
        assert_eq!(TextColor::White.outline(), TextColor::Black);
        assert_eq!(TextColor::Black.outline(), TextColor::White);
        assert_eq!(TextColor::Green.outline(), TextColor::Black);
    }

    #[test]
    fn test_overlay_targeting() {
        let mut request = GenerationRequest::new("u", "/tmp/u");
        let untargeted = TextOverlaySpec::new("everywhere");
        let mut second = TextOverlaySpec::new("second");
        second.image_index = Some(1);
        request.text_overlays = vec![untargeted, second];

        assert_eq!(request.overlays_for(0).len(), 1);
        let on_second: Vec<_> = request.overlays_for(1).iter().map(|o| o.text.as_str()).collect();
        assert_eq!(on_second, vec!["everywhere", "second"]);
        assert_eq!(request.overlay_indices_for(0), vec![0]);
        assert_eq!(request.overlay_indices_for(1), vec![0, 1]);
        assert_eq!(request.overlay_indices_for(2), vec![0]);
    }

    #[test]
    fn test_request_validation() {
        let mut request = GenerationRequest::new("u", "/tmp/u");
        assert!(request.validate().is_ok());

        request.duration_per_image = 0.0;
        assert!(request.validate().is_err());

        request.duration_per_image = 2.0;
        request.transition_duration = -0.5;
        assert!(request.validate().is_err());

        request.transition_duration = 0.0;
        let mut overlay = TextOverlaySpec::new("big");
        overlay.font_size = 0;
        request.text_overlays.push(overlay);
        assert!(request.validate().is_err());
    }
}
