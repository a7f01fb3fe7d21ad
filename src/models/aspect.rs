use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Tall,
    Wide,
    Square,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AspectRatio {
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "1:1")]
    Square1x1,
    #[serde(rename = "16:9")]
    Landscape16x9,
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::Portrait9x16
    }
}

impl AspectRatio {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "9:16" => Some(AspectRatio::Portrait9x16),
            "3:4" => Some(AspectRatio::Portrait3x4),
            "1:1" => Some(AspectRatio::Square1x1),
            "16:9" => Some(AspectRatio::Landscape16x9),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Square1x1 => "1:1",
            AspectRatio::Landscape16x9 => "16:9",
        }
    }

    pub fn orientation(&self) -> Orientation {
        match self {
            AspectRatio::Portrait9x16 | AspectRatio::Portrait3x4 => Orientation::Tall,
            AspectRatio::Landscape16x9 => Orientation::Wide,
            AspectRatio::Square1x1 => Orientation::Square,
        }
    }

    /// Target pixel size used in prompts and by generators that need explicit dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Portrait9x16 => (1080, 1920),
            AspectRatio::Portrait3x4 => (1536, 2048),
            AspectRatio::Square1x1 => (1024, 1024),
            AspectRatio::Landscape16x9 => (1920, 1080),
        }
    }

    pub fn description(&self) -> String {
        let (width, height) = self.dimensions();
        let label = match self.orientation() {
            Orientation::Tall => "VERTICAL",
            Orientation::Wide => "HORIZONTAL",
            Orientation::Square => "SQUARE",
        };
        format!("{} {} ({}x{})", label, self.tag(), width, height)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Orientation for any `W:H` tag. Unknown or unparseable tags use the square rule.
pub fn orientation_for_tag(tag: &str) -> Orientation {
    if let Some(ratio) = AspectRatio::from_tag(tag) {
        return ratio.orientation();
    }
    let parsed = tag
        .split_once(':')
        .and_then(|(w, h)| Some((w.trim().parse::<f64>().ok()?, h.trim().parse::<f64>().ok()?)));
    match parsed {
        Some((w, h)) if h > w => Orientation::Tall,
        Some((w, h)) if w > h => Orientation::Wide,
        _ => Orientation::Square,
    }
}

/// Human description of a tag; unknown tags describe the 9:16 default.
pub fn describe_tag(tag: &str) -> String {
    AspectRatio::from_tag(tag).unwrap_or_default().description()
}
