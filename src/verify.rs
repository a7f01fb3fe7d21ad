//! Closed-loop check that the quote burned into an image matches the source
//! text, with bounded automatic correction.
//!
//! Each cycle transcribes the current image. A match ends the loop. A
//! mismatch asks the image editor to replace the wrong text, and the edited
//! image is transcribed on the next cycle. Nothing here is fatal: every exit
//! path yields an image, annotated as verified or unverified.

use crate::models::{GeneratedImage, TextVerification};
use crate::progress::Progress;
use crate::prompts;
use crate::service::{ImageGenerator, ImageTranscriber};

/// Characters ignored when comparing a transcription with the source quote.
const IGNORED_CHARS: &[char] = &['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '.', ','];

pub fn normalize_text(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !IGNORED_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

pub struct TextVerifier<'a> {
    transcriber: &'a dyn ImageTranscriber,
    editor: &'a dyn ImageGenerator,
    max_cycles: u32,
}

impl<'a> TextVerifier<'a> {
    pub fn new(
        transcriber: &'a dyn ImageTranscriber,
        editor: &'a dyn ImageGenerator,
        max_cycles: u32,
    ) -> Self {
        Self {
            transcriber,
            editor,
            max_cycles: max_cycles.max(1),
        }
    }

    pub async fn verify_and_correct(
        &self,
        image: Vec<u8>,
        expected: &str,
        label: &str,
        progress: Progress<'_>,
    ) -> GeneratedImage {
        let expected_normalized = normalize_text(expected);
        let instruction = prompts::transcription_instruction();
        let mut current = image;
        let mut last_transcription: Option<String> = None;

        for cycle in 1..=self.max_cycles {
            progress.report(&format!("{}: verifying text (cycle {}/{})...", label, cycle, self.max_cycles));

            let transcription = match self.transcriber.transcribe(&current, &instruction).await {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("[verify:{}] transcription failed on cycle {}: {}", label, cycle, e);
                    return unverified(current, last_transcription, cycle, format!("transcription failed: {}", e));
                }
            };

            if normalize_text(&transcription) == expected_normalized {
                log::info!("[verify:{}] text confirmed on cycle {}", label, cycle);
                return GeneratedImage {
                    bytes: current,
                    verification: TextVerification::Verified {
                        confirmed_text: expected_normalized,
                        cycles: cycle,
                    },
                };
            }

            log::warn!(
                "[verify:{}] mismatch on cycle {}: read {:?}, expected {:?}",
                label,
                cycle,
                transcription,
                expected
            );
            last_transcription = Some(transcription);

            if cycle == self.max_cycles {
                break;
            }

            progress.report(&format!("{}: correcting rendered text...", label));
            let wrong = last_transcription.as_deref().unwrap_or_default();
            let correction = prompts::correction_instruction(wrong, expected);
            match self.editor.edit(&current, &correction).await {
                Ok(edited) if !edited.is_empty() => current = edited,
                Ok(_) => {
                    log::warn!("[verify:{}] correction returned an empty image", label);
                    return unverified(current, last_transcription, cycle, "correction returned no image".to_string());
                }
                Err(e) => {
                    log::warn!("[verify:{}] correction failed: {}", label, e);
                    return unverified(current, last_transcription, cycle, format!("correction returned no image: {}", e));
                }
            }
        }

        log::warn!(
            "[verify:{}] auto-correction failed after {} cycles",
            label,
            self.max_cycles
        );
        unverified(
            current,
            last_transcription,
            self.max_cycles,
            "auto-correction failed".to_string(),
        )
    }
}

fn unverified(bytes: Vec<u8>, last_transcription: Option<String>, cycles: u32, reason: String) -> GeneratedImage {
    GeneratedImage {
        bytes,
        verification: TextVerification::Unverified {
            last_transcription,
            cycles,
            reason,
        },
    }
}
