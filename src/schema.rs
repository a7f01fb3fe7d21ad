use crate::models::GenerationOptions;
use serde_json::{json, Map, Value};

/// Response schema handed to the text model. Optional outputs are only
/// declared when the caller asked for them.
pub fn response_schema(options: &GenerationOptions, image_prompt_needed: bool) -> Value {
    let mut properties = Map::new();
    properties.insert("spec_id".into(), json!({ "type": "STRING" }));
    properties.insert(
        "mode".into(),
        json!({ "type": "STRING", "enum": ["AUTO", "MANUAL", "JSON", "JSON_TO_IMAGE"] }),
    );
    properties.insert(
        "quote".into(),
        json!({
            "type": "OBJECT",
            "properties": { "text": { "type": "STRING" } },
            "required": ["text"]
        }),
    );
    properties.insert(
        "metadata".into(),
        json!({
            "type": "OBJECT",
            "properties": {
                "author": { "type": "STRING" },
                "source": { "type": "STRING" }
            },
            "required": ["author", "source"]
        }),
    );

    if options.want_image_prompt || image_prompt_needed {
        properties.insert(
            "jsonImagePrompt".into(),
            json!({
                "type": "STRING",
                "description": "A valid, properly escaped JSON document with every image generation detail.",
                "nullable": true
            }),
        );
    }
    if options.want_video_prompt {
        properties.insert(
            "jsonVideoPrompt".into(),
            json!({
                "type": "STRING",
                "description": "A valid, properly escaped JSON document with every video generation detail.",
                "nullable": true
            }),
        );
    }
    if options.want_caption {
        properties.insert(
            "caption".into(),
            json!({
                "type": "OBJECT",
                "nullable": true,
                "properties": {
                    "quote": { "type": "STRING" },
                    "author": { "type": "STRING" },
                    "source": { "type": "STRING" },
                    "description": { "type": "STRING" },
                    "hashtags": { "type": "ARRAY", "items": { "type": "STRING" } }
                },
                "required": ["quote", "author", "source", "description", "hashtags"]
            }),
        );
        properties.insert(
            "altText".into(),
            json!({ "type": "STRING", "nullable": true }),
        );
    }

    properties.insert(
        "technical_specs".into(),
        json!({
            "type": "OBJECT",
            "properties": {
                "aspect_ratio": { "type": "STRING" },
                "resolution": { "type": "STRING" }
            },
            "required": ["aspect_ratio", "resolution"]
        }),
    );

    json!({
        "type": "OBJECT",
        "properties": Value::Object(properties),
        "required": ["spec_id", "mode", "quote", "metadata", "technical_specs"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_only_declares_requested_outputs() {
        let options = GenerationOptions::none().with_caption(true);
        let schema = response_schema(&options, false);
        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("caption"));
        assert!(properties.contains_key("altText"));
        assert!(!properties.contains_key("jsonImagePrompt"));
        assert!(!properties.contains_key("jsonVideoPrompt"));
        assert!(properties.contains_key("technical_specs"));
    }

    #[test]
    fn image_stage_forces_image_prompt() {
        let schema = response_schema(&GenerationOptions::none(), true);
        assert!(schema["properties"]["jsonImagePrompt"].is_object());
    }
}
