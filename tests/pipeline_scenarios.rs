mod common;

use common::*;
use mantra_gen::{
    silent, GenerationMode, GenerationOptions, GenerationPipeline, HistoryBuffer, ImageCount,
    PipelineConfig, PipelineError, QuoteInputs, ServiceError, TextVerification,
};
use std::sync::{Arc, Mutex};

const MANUAL_SPEC: &str = r#"{
    "mode": "MANUAL",
    "quote": {"text": "Do or do not. There is no try."},
    "metadata": {"author": "Yoda", "source": "The Empire Strikes Back"},
    "jsonImagePrompt": "{\"scene\":\"desk\"},",
    "jsonVideoPrompt": "{\"shot\":\"dolly\"}",
    "caption": {"quote": "Do or do not.", "author": "Yoda", "source": "ESB", "description": "d", "hashtags": []},
    "altText": "alt",
    "technical_specs": {"aspect_ratio": "9:16", "resolution": "1080x1920"}
}"#;

fn yoda() -> QuoteInputs {
    QuoteInputs {
        quote: "Do or do not. There is no try.".into(),
        author: "Yoda".into(),
        source: "The Empire Strikes Back".into(),
    }
}

fn pipeline(text: Arc<ScriptedText>, images: Arc<ScriptedImages>) -> GenerationPipeline {
    GenerationPipeline::new(text, images)
        .with_decoder(Arc::new(SizeDecoder))
        .with_config(PipelineConfig::immediate())
}

fn image_prompt_and_one_image() -> GenerationOptions {
    GenerationOptions::none()
        .with_image_prompt(true)
        .with_images(ImageCount::One)
}

#[tokio::test]
async fn manual_run_repairs_payload_and_renders_once() {
    let text = Arc::new(ScriptedText::replying(MANUAL_SPEC));
    let images = Arc::new(ScriptedImages::always(tall()));
    let output = pipeline(text.clone(), images.clone())
        .run(
            GenerationMode::Manual,
            &yoda(),
            "",
            "9:16",
            &HistoryBuffer::new(),
            &silent,
            &image_prompt_and_one_image(),
        )
        .await
        .unwrap();

    assert_eq!(text.calls(), 1);
    let calls = images.generate_calls.lock().unwrap().clone();
    assert_eq!(calls, vec![(r#"{"scene":"desk"}"#.to_string(), "9:16".to_string())]);

    assert_eq!(output.images.len(), 1);
    assert_eq!(output.images[0].bytes, tall());
    assert_eq!(output.spec.image_prompt(), r#"{"scene":"desk"}"#);
    assert_eq!(output.spec.video_prompt_payload, None);
    assert!(output.spec.caption.is_none());
    assert!(output.spec.alt_text.is_none());
    assert!(!output.spec.spec_id.is_empty());
}

#[tokio::test]
async fn first_variation_failure_is_fatal() {
    let text = Arc::new(ScriptedText::replying(MANUAL_SPEC));
    let images = Arc::new(ScriptedImages::always(wide()));
    let err = pipeline(text, images.clone())
        .run(
            GenerationMode::Manual,
            &yoda(),
            "",
            "9:16",
            &HistoryBuffer::new(),
            &silent,
            &GenerationOptions::new().with_images(ImageCount::Two),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::ImageGenerationExhausted { variation: 1, attempts: 2 }
    ));
    assert_eq!(images.generate_count(), 2);
}

#[tokio::test]
async fn second_variation_failure_is_omitted() {
    let text = Arc::new(ScriptedText::replying(MANUAL_SPEC));
    let images = Arc::new(ScriptedImages::new(vec![Ok(tall())], wide()));
    let output = pipeline(text, images.clone())
        .run(
            GenerationMode::Manual,
            &yoda(),
            "",
            "9:16",
            &HistoryBuffer::new(),
            &silent,
            &GenerationOptions::new().with_images(ImageCount::Two),
        )
        .await
        .unwrap();

    assert_eq!(output.images.len(), 1);
    assert_eq!(images.generate_count(), 3);
}

#[tokio::test]
async fn rate_limited_attempt_is_retried_within_budget() {
    let text = Arc::new(ScriptedText::replying(MANUAL_SPEC));
    let images = Arc::new(ScriptedImages::new(
        vec![Err(ServiceError::RateLimited("429".into()))],
        tall(),
    ));
    let output = pipeline(text, images.clone())
        .run(
            GenerationMode::Manual,
            &yoda(),
            "",
            "9:16",
            &HistoryBuffer::new(),
            &silent,
            &image_prompt_and_one_image(),
        )
        .await
        .unwrap();

    assert_eq!(output.images.len(), 1);
    assert_eq!(images.generate_count(), 2);
}

#[tokio::test]
async fn planning_rate_limit_fails_without_images() {
    let text = Arc::new(ScriptedText::new(vec![Err(ServiceError::RateLimited(
        "ThrottlingException".into(),
    ))]));
    let images = Arc::new(ScriptedImages::always(tall()));
    let err = pipeline(text, images.clone())
        .run(
            GenerationMode::Auto,
            &QuoteInputs::default(),
            "",
            "9:16",
            &HistoryBuffer::new(),
            &silent,
            &GenerationOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::RateLimited { stage: "planning" }));
    assert!(err.is_retryable());
    assert_eq!(images.generate_count(), 0);
}

#[tokio::test]
async fn invalid_json_input_never_reaches_services() {
    let text = Arc::new(ScriptedText::new(Vec::new()));
    let images = Arc::new(ScriptedImages::always(tall()));
    let err = pipeline(text.clone(), images.clone())
        .run(
            GenerationMode::Json,
            &QuoteInputs::default(),
            "{\"quote\": ",
            "9:16",
            &HistoryBuffer::new(),
            &silent,
            &GenerationOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidInput(_)));
    assert_eq!(text.calls(), 0);
    assert_eq!(images.generate_count(), 0);
}

#[tokio::test]
async fn json_to_image_renders_even_without_image_option() {
    let text = Arc::new(ScriptedText::new(Vec::new()));
    let images = Arc::new(ScriptedImages::always(fake_image(1024, 1024)));
    let output = pipeline(text.clone(), images.clone())
        .run(
            GenerationMode::JsonToImage,
            &QuoteInputs::default(),
            r#"{"scene": "sunrise over dunes", "text": "Begin."}"#,
            "1:1",
            &HistoryBuffer::new(),
            &silent,
            &GenerationOptions::none().with_images(ImageCount::One).without_images(),
        )
        .await
        .unwrap();

    assert_eq!(text.calls(), 0);
    assert_eq!(output.images.len(), 1);
    let calls = images.generate_calls.lock().unwrap().clone();
    assert_eq!(calls[0].1, "1:1");
    assert!(calls[0].0.contains("sunrise over dunes"));
}

#[tokio::test]
async fn text_only_run_makes_no_image_calls() {
    let text = Arc::new(ScriptedText::replying(MANUAL_SPEC));
    let images = Arc::new(ScriptedImages::always(tall()));
    let output = pipeline(text, images.clone())
        .run(
            GenerationMode::Manual,
            &yoda(),
            "",
            "9:16",
            &HistoryBuffer::new(),
            &silent,
            &GenerationOptions::none().with_caption(true),
        )
        .await
        .unwrap();

    assert!(output.images.is_empty());
    assert_eq!(images.generate_count(), 0);
    assert!(output.spec.caption.is_some());
    assert_eq!(output.spec.image_prompt_payload, None);
    assert_eq!(output.spec.video_prompt_payload, None);
}

#[tokio::test]
async fn missing_image_prompt_stops_before_rendering() {
    let spec = r#"{"quote": {"text": "Begin."}, "metadata": {"author": "Plato", "source": ""}}"#;
    let text = Arc::new(ScriptedText::replying(spec));
    let images = Arc::new(ScriptedImages::always(tall()));
    let err = pipeline(text, images.clone())
        .run(
            GenerationMode::Auto,
            &QuoteInputs::default(),
            "",
            "9:16",
            &HistoryBuffer::new(),
            &silent,
            &image_prompt_and_one_image(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::MissingImagePrompt));
    assert_eq!(images.generate_count(), 0);
}

#[tokio::test]
async fn malformed_outer_spec_is_repaired() {
    let spec = r#"{"quote": {"text": "Begin."}, "metadata": {"author": "Plato", "source": "Laws"},"#;
    let text = Arc::new(ScriptedText::replying(spec));
    let images = Arc::new(ScriptedImages::always(tall()));
    let output = pipeline(text, images)
        .run(
            GenerationMode::Auto,
            &QuoteInputs::default(),
            "",
            "9:16",
            &HistoryBuffer::new(),
            &silent,
            &GenerationOptions::none(),
        )
        .await
        .unwrap();

    assert_eq!(output.spec.quote_text(), "Begin.");
    assert_eq!(output.spec.metadata.source, "Laws");
}

#[tokio::test]
async fn outer_spec_repair_keeps_non_ascii_quote() {
    let spec = "{\"quote\":{\"text\":\"Café — ça va, naïve.\"},\"metadata\":{\"author\":\"Zoë\",\"source\":\"Lettres\"},";
    let text = Arc::new(ScriptedText::replying(spec));
    let images = Arc::new(ScriptedImages::always(tall()));
    let output = pipeline(text, images)
        .run(
            GenerationMode::Auto,
            &QuoteInputs::default(),
            "",
            "9:16",
            &HistoryBuffer::new(),
            &silent,
            &GenerationOptions::none(),
        )
        .await
        .unwrap();

    assert_eq!(output.spec.quote_text(), "Café — ça va, naïve.");
    assert_eq!(output.spec.metadata.author, "Zoë");
    assert_eq!(output.spec.metadata.source, "Lettres");
}

#[tokio::test]
async fn rendered_text_is_verified_when_transcriber_present() {
    let text = Arc::new(ScriptedText::replying(MANUAL_SPEC));
    let images = Arc::new(ScriptedImages::always(tall()));
    let output = pipeline(text, images.clone())
        .with_transcriber(Arc::new(FixedOcr("DO OR DO NOT. THERE IS NO TRY.".into())))
        .with_config(PipelineConfig::immediate().with_verify_text(true))
        .run(
            GenerationMode::Manual,
            &yoda(),
            "",
            "9:16",
            &HistoryBuffer::new(),
            &silent,
            &image_prompt_and_one_image(),
        )
        .await
        .unwrap();

    assert!(matches!(
        output.images[0].verification,
        TextVerification::Verified { cycles: 1, .. }
    ));
    assert!(images.edit_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn progress_reports_phases_in_order() {
    let text = Arc::new(ScriptedText::replying(MANUAL_SPEC));
    let images = Arc::new(ScriptedImages::always(tall()));
    let seen = Mutex::new(Vec::new());
    let on_progress = |message: &str| seen.lock().unwrap().push(message.to_string());

    pipeline(text, images)
        .run(
            GenerationMode::Manual,
            &yoda(),
            "",
            "9:16",
            &HistoryBuffer::new(),
            &on_progress,
            &GenerationOptions::new().with_images(ImageCount::Two),
        )
        .await
        .unwrap();

    let seen = seen.into_inner().unwrap();
    let phase_one = seen.iter().position(|m| m.starts_with("Phase 1")).unwrap();
    let phase_two = seen.iter().position(|m| m.starts_with("Phase 2: Production")).unwrap();
    let variation_two = seen.iter().position(|m| m.starts_with("Phase 2: Variation 2")).unwrap();
    assert!(phase_one < phase_two && phase_two < variation_two);
}

#[tokio::test]
async fn empty_edit_request_is_rejected() {
    let text = Arc::new(ScriptedText::new(Vec::new()));
    let images = Arc::new(ScriptedImages::always(tall()));
    let pipeline = pipeline(text, images.clone());

    let err = pipeline.apply_edit(&tall(), "   ", "9:16").await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));

    let edited = pipeline.apply_edit(&tall(), "warmer light", "9:16").await.unwrap();
    assert_eq!(edited, tall());
    let instructions = images.edit_calls.lock().unwrap().clone();
    assert!(instructions[0].contains("warmer light"));
    assert!(instructions[0].contains("VERTICAL 9:16"));
}
