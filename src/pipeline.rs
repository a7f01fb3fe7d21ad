use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, ServiceError};
use crate::logger;
use crate::models::{
    AspectRatio, AssetSpec, GeneratedImage, GenerationMode, GenerationOptions, HistoryBuffer,
    ImageCount, PipelineOutput, QuoteInputs,
};
use crate::progress::{Progress, ProgressFn};
use crate::repair;
use crate::service::{DimensionDecoder, ImageGenerator, ImageHeaderDecoder, ImageTranscriber, TextGenerator};
use crate::verify::TextVerifier;
use crate::{prompts, schema, validator};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const IMAGE_PROMPT_FIELD: &str = "imagePromptPayload";
pub const VIDEO_PROMPT_FIELD: &str = "videoPromptPayload";
pub const SPEC_FIELD: &str = "spec";

/// Sequences spec planning, JSON repair, image production and text
/// verification for one request at a time. Holds no state between runs.
#[derive(Clone)]
pub struct GenerationPipeline {
    text: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageGenerator>,
    transcriber: Option<Arc<dyn ImageTranscriber>>,
    decoder: Arc<dyn DimensionDecoder>,
    config: PipelineConfig,
}

impl GenerationPipeline {
    pub fn new(text: Arc<dyn TextGenerator>, images: Arc<dyn ImageGenerator>) -> Self {
        Self {
            text,
            images,
            transcriber: None,
            decoder: Arc::new(ImageHeaderDecoder),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn ImageTranscriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn DimensionDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        mode: GenerationMode,
        inputs: &QuoteInputs,
        json_input: &str,
        aspect_ratio: &str,
        history: &HistoryBuffer,
        on_progress: &ProgressFn<'_>,
        options: &GenerationOptions,
    ) -> Result<PipelineOutput> {
        let progress = Progress::new(on_progress);
        let _timer = logger::timer(&format!("{} run", mode));
        let image_stage = options.want_image || mode.mandates_image();
        log::info!(
            "🎬 Starting {} run: image prompt {}, video prompt {}, caption {}, images {}",
            mode,
            options.want_image_prompt,
            options.want_video_prompt,
            options.want_caption,
            if image_stage { options.image_count.get() } else { 0 }
        );

        progress.report("Phase 1: Directors Board (Generating JSON Spec)...");
        let mut spec = if mode.is_direct_json() {
            parse_direct_input(mode, json_input)?
        } else {
            self.plan_spec(mode, inputs, aspect_ratio, history, options, image_stage, progress)
                .await?
        };

        normalize_spec(&mut spec, options, image_stage)?;
        fill_run_identity(&mut spec, mode, aspect_ratio);
        let _scope = logger::run_scope(&spec.spec_id);
        log::info!("📋 Spec {} ready: \"{}\"", spec.spec_id, spec.quote_text());

        if !image_stage {
            return Ok(PipelineOutput {
                spec,
                images: Vec::new(),
            });
        }

        if spec.image_prompt().trim().is_empty() {
            log::error!("[production] {} is empty; cannot generate images", IMAGE_PROMPT_FIELD);
            return Err(PipelineError::MissingImagePrompt);
        }

        pause(self.config.planning_cooldown).await;

        let images = self
            .produce_images(&spec, aspect_ratio, options.image_count, progress)
            .await?;

        Ok(PipelineOutput { spec, images })
    }

    /// User-directed edit of an already produced image.
    pub async fn apply_edit(
        &self,
        image: &[u8],
        request: &str,
        aspect_ratio: &str,
    ) -> Result<Vec<u8>> {
        if request.trim().is_empty() {
            return Err(PipelineError::InvalidInput("edit instruction is empty".into()));
        }
        let instruction = prompts::edit_instruction(request, aspect_ratio);
        let edited = self.images.edit(image, &instruction).await.map_err(|e| {
            log::error!("[editing] image edit failed: {}", e);
            if e.is_rate_limited() {
                PipelineError::RateLimited { stage: "editing" }
            } else {
                PipelineError::Service(e)
            }
        })?;
        if edited.is_empty() {
            return Err(ServiceError::NoImage("edit returned an empty image".into()).into());
        }
        Ok(edited)
    }

    #[allow(clippy::too_many_arguments)]
    async fn plan_spec(
        &self,
        mode: GenerationMode,
        inputs: &QuoteInputs,
        aspect_ratio: &str,
        history: &HistoryBuffer,
        options: &GenerationOptions,
        image_stage: bool,
        progress: Progress<'_>,
    ) -> Result<AssetSpec> {
        let system = prompts::system_prompt();
        let user = prompts::plan_prompt(mode, inputs, aspect_ratio, history, options, image_stage);
        let schema = schema::response_schema(options, image_stage);
        log::debug!("[planning] user prompt:\n{}", user);

        let raw = match self.text.generate(&system, &user, &schema).await {
            Ok(raw) => raw,
            Err(e) if e.is_rate_limited() => {
                log::warn!(
                    "[planning] rate limited, waiting {:?} before giving up: {}",
                    self.config.rate_limit_cooldown,
                    e
                );
                progress.report("Rate limit hit during planning. Cooling down...");
                pause(self.config.rate_limit_cooldown).await;
                return Err(PipelineError::RateLimited { stage: "planning" });
            }
            Err(e) => {
                log::error!("[planning] text generation failed: {}", e);
                return Err(e.into());
            }
        };
        log::debug!("[planning] raw spec response ({} chars)", raw.len());

        let text = repair::repair_document(&raw, SPEC_FIELD)?;
        if text.is_empty() {
            log::error!("[planning] text model returned an empty spec");
            return Err(ServiceError::ResponseError("Empty spec response.".into()).into());
        }
        serde_json::from_str::<AssetSpec>(&text).map_err(|e| {
            log::error!("[planning] spec does not match the expected shape: {}", e);
            ServiceError::ResponseError(format!("spec does not match the expected shape: {}", e))
                .into()
        })
    }

    async fn produce_images(
        &self,
        spec: &AssetSpec,
        aspect_ratio: &str,
        count: ImageCount,
        progress: Progress<'_>,
    ) -> Result<Vec<GeneratedImage>> {
        let prompt = spec.image_prompt();
        let mut images = Vec::with_capacity(count.get());

        for variation in 1..=count.get() {
            if variation > 1 {
                progress.report(&format!("Phase 2: Variation {} (Cooling down)...", variation));
                pause(self.config.variation_cooldown).await;
            } else {
                progress.report("Phase 2: Production (Generating Scenes)...");
            }

            match self.produce_variation(variation, prompt, aspect_ratio, progress).await {
                Some(bytes) => {
                    let image = self
                        .verify_text(bytes, spec.quote_text(), variation, progress)
                        .await;
                    images.push(image);
                }
                None if variation == 1 => {
                    log::error!("[production] variation 1 exhausted all attempts");
                    return Err(PipelineError::ImageGenerationExhausted {
                        variation,
                        attempts: self.config.max_image_attempts,
                    });
                }
                None => {
                    log::error!(
                        "[production] variation {} exhausted all attempts; continuing with {} image(s)",
                        variation,
                        images.len()
                    );
                }
            }
        }

        Ok(images)
    }

    async fn produce_variation(
        &self,
        variation: usize,
        prompt: &str,
        aspect_ratio: &str,
        progress: Progress<'_>,
    ) -> Option<Vec<u8>> {
        let max_attempts = self.config.max_image_attempts;
        for attempt in 1..=max_attempts {
            if attempt > 1 {
                progress.report(&format!(
                    "Variation {}: Attempt {} (Retrying)...",
                    variation, attempt
                ));
            }
            let retries_left = attempt < max_attempts;

            match self.images.generate(prompt, aspect_ratio).await {
                Ok(bytes) => {
                    if validator::validate_image(self.decoder.as_ref(), &bytes, aspect_ratio) {
                        return Some(bytes);
                    }
                    log::warn!(
                        "[Variation {} Attempt {}] Incorrect aspect ratio, discarding",
                        variation,
                        attempt
                    );
                }
                Err(e) if e.is_rate_limited() => {
                    log::warn!("[Variation {} Attempt {}] Rate limited: {}", variation, attempt, e);
                    if retries_left {
                        progress.report("Rate limit hit. Cooling down...");
                        pause(self.config.rate_limit_cooldown).await;
                    }
                }
                Err(e) => {
                    log::error!("[Variation {} Attempt {}] Error: {}", variation, attempt, e);
                    if retries_left {
                        pause(self.config.transient_error_delay).await;
                    }
                }
            }
        }
        None
    }

    async fn verify_text(
        &self,
        bytes: Vec<u8>,
        quote: &str,
        variation: usize,
        progress: Progress<'_>,
    ) -> GeneratedImage {
        if !self.config.verify_text || quote.trim().is_empty() {
            return GeneratedImage::new(bytes);
        }
        let Some(transcriber) = self.transcriber.as_deref() else {
            log::warn!("[verify] text verification enabled but no transcriber configured; skipping");
            return GeneratedImage::new(bytes);
        };
        let label = format!("Variation {}", variation);
        TextVerifier::new(transcriber, self.images.as_ref(), self.config.max_verify_cycles)
            .verify_and_correct(bytes, quote, &label, progress)
            .await
    }
}

/// Stage A for the direct JSON modes. No remote service is involved.
pub fn parse_direct_input(mode: GenerationMode, json_input: &str) -> Result<AssetSpec> {
    let value: Value = serde_json::from_str(json_input).map_err(|e| {
        log::error!("[input] caller JSON does not parse: {}", e);
        PipelineError::InvalidInput(e.to_string())
    })?;

    if mode == GenerationMode::JsonToImage && !looks_like_spec(&value) {
        log::info!("[input] treating the whole document as the image prompt payload");
        return Ok(AssetSpec {
            mode: mode.as_str().to_string(),
            image_prompt_payload: Some(json_input.trim().to_string()),
            ..Default::default()
        });
    }

    serde_json::from_value::<AssetSpec>(value).map_err(|e| {
        log::error!("[input] caller JSON is not a spec: {}", e);
        PipelineError::InvalidInput(e.to_string())
    })
}

fn looks_like_spec(value: &Value) -> bool {
    value.as_object().map_or(false, |object| {
        ["spec_id", "quote", "metadata", "jsonImagePrompt"]
            .iter()
            .any(|key| object.contains_key(*key))
    })
}

/// Stage A.5: repair requested payloads and clear everything not requested.
pub fn normalize_spec(
    spec: &mut AssetSpec,
    options: &GenerationOptions,
    image_stage: bool,
) -> Result<()> {
    normalize_payload(
        &mut spec.image_prompt_payload,
        IMAGE_PROMPT_FIELD,
        options.want_image_prompt || image_stage,
    )?;
    normalize_payload(
        &mut spec.video_prompt_payload,
        VIDEO_PROMPT_FIELD,
        options.want_video_prompt,
    )?;

    if !options.want_caption {
        if spec.caption.is_some() || spec.alt_text.is_some() {
            log::debug!("[normalize] clearing unrequested caption and alt text");
        }
        spec.caption = None;
        spec.alt_text = None;
    }
    Ok(())
}

fn normalize_payload(field: &mut Option<String>, label: &str, requested: bool) -> Result<()> {
    if !requested {
        if field.as_deref().map_or(false, |payload| !payload.is_empty()) {
            log::warn!("[normalize] {} was returned but not requested; clearing", label);
        }
        *field = None;
        return Ok(());
    }

    match field.take() {
        None => {
            log::warn!("[normalize] {} was requested but is missing; storing empty string", label);
            *field = Some(String::new());
        }
        Some(raw) => {
            let repaired = repair::repair(&raw, label).map_err(|e| {
                log::error!("[normalize] {} could not be repaired", label);
                PipelineError::from(e)
            })?;
            *field = Some(repaired);
        }
    }
    Ok(())
}

fn fill_run_identity(spec: &mut AssetSpec, mode: GenerationMode, aspect_ratio: &str) {
    if spec.spec_id.trim().is_empty() {
        spec.spec_id = Uuid::new_v4().to_string();
    }
    if spec.mode.trim().is_empty() {
        spec.mode = mode.as_str().to_string();
    }
    if spec.technical_specs.aspect_ratio.trim().is_empty() {
        spec.technical_specs.aspect_ratio = aspect_ratio.to_string();
    }
    if spec.technical_specs.resolution.trim().is_empty() {
        if let Some(ratio) = AspectRatio::from_tag(aspect_ratio) {
            let (width, height) = ratio.dimensions();
            spec.technical_specs.resolution = format!("{}x{}", width, height);
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        log::debug!("⏳ cooling down for {:?}", duration);
        tokio::time::sleep(duration).await;
    }
}
