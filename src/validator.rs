use crate::models::{orientation_for_tag, Orientation};
use crate::service::DimensionDecoder;

/// Margin by which the long side must exceed the short side for tall and wide tags.
pub const ORIENTATION_TOLERANCE: f64 = 1.05;
/// Maximum relative side difference accepted for square tags.
pub const SQUARE_TOLERANCE: f64 = 0.15;

pub fn validate(width: u32, height: u32, expected_ratio: &str) -> bool {
    let (w, h) = (width as f64, height as f64);
    match orientation_for_tag(expected_ratio) {
        Orientation::Tall => h > w * ORIENTATION_TOLERANCE,
        Orientation::Wide => w > h * ORIENTATION_TOLERANCE,
        Orientation::Square => {
            let mean = (w + h) / 2.0;
            mean > 0.0 && (w - h).abs() / mean < SQUARE_TOLERANCE
        }
    }
}

/// Decode and validate in one step. An undecodable image never passes.
pub fn validate_image(decoder: &dyn DimensionDecoder, image: &[u8], expected_ratio: &str) -> bool {
    match decoder.dimensions(image) {
        Ok((width, height)) => {
            let fits = validate(width, height, expected_ratio);
            log::debug!(
                "[validator] expected {}, got {}x{} -> {}",
                expected_ratio,
                width,
                height,
                if fits { "accepted" } else { "rejected" }
            );
            fits
        }
        Err(e) => {
            log::warn!("[validator] could not read image dimensions, rejecting: {}", e);
            false
        }
    }
}
