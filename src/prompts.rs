use crate::models::{describe_tag, GenerationMode, GenerationOptions, HistoryBuffer, QuoteInputs};

/// Quotes from history listed in the AUTO prompt.
const HISTORY_QUOTES_IN_PROMPT: usize = 5;

pub fn system_prompt() -> String {
    "You are Mantra Wayfinding, a prompt engineer for image and video models.\n\
     Produce a JSON object containing ready-to-use master prompts for a quote image.\n\
     The image generator knows nothing beyond the prompt, so 'jsonImagePrompt' must be \
     exhaustive and standalone: visual style, scene, lighting, text rendering, camera, \
     technical specs, negative prompts and watermark.\n\
     The quote text must appear in the prompt exactly, character for character.\n\
     Author and source are metadata only and are never rendered.\n\
     OUTPUT CONTRACT: return only a valid JSON object matching the schema."
        .to_string()
}

pub fn plan_prompt(
    mode: GenerationMode,
    inputs: &QuoteInputs,
    aspect_ratio: &str,
    history: &HistoryBuffer,
    options: &GenerationOptions,
    image_prompt_needed: bool,
) -> String {
    let mut prompt = format!(
        "TASK: Generate the master JSON spec.\n\nINPUT DATA:\n- Aspect Ratio: {}\n",
        describe_tag(aspect_ratio)
    );

    match mode {
        GenerationMode::Manual => {
            prompt.push_str(&format!(
                "- Mode: MANUAL\n- Quote: \"{}\"\n- Author: \"{}\"\n- Source: \"{}\"\n",
                inputs.quote, inputs.author, inputs.source
            ));
        }
        _ => {
            prompt.push_str(
                "- Mode: AUTO (select one unique, verified self-development quote of at most 25 words)\n",
            );
            let recent = history.first_quotes(HISTORY_QUOTES_IN_PROMPT);
            if !recent.is_empty() {
                prompt.push_str(&format!("- Do not use these quotes: {}\n", recent.join(" | ")));
            }
            if !history.recent_authors.is_empty() {
                prompt.push_str(&format!(
                    "- Avoid these recent authors: {}\n",
                    history.recent_authors.join(", ")
                ));
            }
        }
    }

    prompt.push_str("\nREQUESTED OUTPUTS:\n");
    let mut requested = Vec::new();
    if options.want_image_prompt || image_prompt_needed {
        requested.push("jsonImagePrompt");
    }
    if options.want_video_prompt {
        requested.push("jsonVideoPrompt");
    }
    if options.want_caption {
        requested.push("caption");
        requested.push("altText");
    }
    if requested.is_empty() {
        prompt.push_str("- none beyond the core fields\n");
    } else {
        for field in &requested {
            prompt.push_str(&format!("- {}\n", field));
        }
        prompt.push_str("Leave every other optional field null.\n");
    }

    if options.want_image_prompt || image_prompt_needed {
        prompt.push_str(&format!(
            "\n'jsonImagePrompt' must start with the technical header \"STRICT OUTPUT FORMAT: {}\" \
             and command the renderer to write the quote exactly, character for character.\n",
            aspect_ratio
        ));
    }
    prompt
}

pub fn transcription_instruction() -> String {
    "Transcribe only the large, primary text rendered in this image. Return it literally, \
     exactly as written, without correcting spelling or punctuation. Do not include the \
     watermark or any other small text. Return plain text only."
        .to_string()
}

pub fn correction_instruction(wrong_text: &str, correct_text: &str) -> String {
    format!(
        "The large text in this image reads \"{}\" but it must read exactly \"{}\". \
         Erase the wrong text and render the correct text in its place using the same font, \
         size, color, material and lighting. Change nothing else in the image.",
        wrong_text, correct_text
    )
}

pub fn edit_instruction(user_request: &str, aspect_ratio: &str) -> String {
    format!(
        "Edit this image: {}. Maintain text readability. STRICT FORMAT: {}. DO NOT CROP.",
        user_request,
        describe_tag(aspect_ratio)
    )
}
