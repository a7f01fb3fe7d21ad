use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AssetSpec;

/// Outcome of the OCR verify-and-correct loop for one image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TextVerification {
    /// Verification was disabled or there was no quote to check.
    Skipped,
    Verified {
        confirmed_text: String,
        cycles: u32,
    },
    /// Drift warning: the image is still usable but its text may be wrong.
    Unverified {
        last_transcription: Option<String>,
        cycles: u32,
        reason: String,
    },
}

impl TextVerification {
    pub fn is_verified(&self) -> bool {
        matches!(self, TextVerification::Verified { .. })
    }

    pub fn is_drift_warning(&self) -> bool {
        matches!(self, TextVerification::Unverified { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub verification: TextVerification,
}

impl GeneratedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            verification: TextVerification::Skipped,
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub spec: AssetSpec,
    /// Index 0 is the first variation.
    pub images: Vec<GeneratedImage>,
}

/// A finished asset as the presentation layer stores it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedAsset {
    pub id: String,
    pub image_base64: String,
    pub spec: AssetSpec,
    pub formatted_caption: String,
    pub timestamp: i64,
}

impl SavedAsset {
    /// Packages one produced image with its spec. `timestamp` is Unix millis.
    pub fn new(spec: &AssetSpec, image: &GeneratedImage, formatted_caption: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            image_base64: image.to_base64(),
            spec: spec.clone(),
            formatted_caption,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn image_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.image_base64)
    }
}
