//! Runs the whole pipeline against local stand-ins for the generation
//! services: no network, no credentials.
//!
//! cargo run --example offline --no-default-features

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use mantra_gen::{
    format_caption, logger, models::AspectRatio, GenerationMode, GenerationOptions,
    GenerationPipeline, HistoryStore, ImageCount, ImageGenerator, ImageTranscriber,
    PipelineConfig, QuoteInputs, SavedAsset, ServiceError, ServiceResult, TextGenerator,
};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;

struct CannedPlanner;

#[async_trait]
impl TextGenerator for CannedPlanner {
    async fn generate(&self, _system: &str, _user: &str, _schema: &Value) -> ServiceResult<String> {
        // Trailing comma inside the image prompt exercises the repair path.
        Ok(json!({
            "mode": "MANUAL",
            "quote": { "text": "Well begun is half done." },
            "metadata": { "author": "Aristotle", "source": "Politics" },
            "jsonImagePrompt": "{\"scene\":\"marble steps at dawn\",\"text\":\"Well begun is half done.\",}",
            "caption": {
                "quote": "Well begun is half done.",
                "author": "Aristotle",
                "source": "Politics",
                "description": "The first step carries the rest.",
                "hashtags": ["stoic", "#begin"]
            },
            "altText": "Carved words on marble steps"
        })
        .to_string())
    }
}

/// Paints a flat PNG at the size the ratio asks for.
struct Painter;

#[async_trait]
impl ImageGenerator for Painter {
    async fn generate(&self, _prompt: &str, aspect_ratio: &str) -> ServiceResult<Vec<u8>> {
        let (width, height) = AspectRatio::from_tag(aspect_ratio)
            .unwrap_or_default()
            .dimensions();
        encode(RgbImage::from_pixel(width / 4, height / 4, Rgb([214, 196, 160])))
    }

    async fn edit(&self, image: &[u8], _instruction: &str) -> ServiceResult<Vec<u8>> {
        Ok(image.to_vec())
    }
}

struct PerfectReader;

#[async_trait]
impl ImageTranscriber for PerfectReader {
    async fn transcribe(&self, _image: &[u8], _instruction: &str) -> ServiceResult<String> {
        Ok("WELL BEGUN IS HALF DONE".to_string())
    }
}

fn encode(image: RgbImage) -> ServiceResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| ServiceError::DecodeError(e.to_string()))?;
    Ok(bytes)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logger::init_with_config(logger::LoggerConfig::development())?;

    let pipeline = GenerationPipeline::new(Arc::new(CannedPlanner), Arc::new(Painter))
        .with_transcriber(Arc::new(PerfectReader))
        .with_config(PipelineConfig::immediate().with_verify_text(true));

    let store = HistoryStore::in_memory();
    let mut history = store.load_history().await?;

    let inputs = QuoteInputs {
        quote: "Well begun is half done.".into(),
        author: "Aristotle".into(),
        source: "Politics".into(),
    };
    let options = GenerationOptions::new()
        .with_video_prompt(false)
        .with_images(ImageCount::Two);
    let on_progress = |message: &str| println!("▶ {}", message);

    let output = pipeline
        .run(GenerationMode::Manual, &inputs, "", "9:16", &history, &on_progress, &options)
        .await?;

    println!("\nspec {}", output.spec.spec_id);
    println!("image prompt: {}", output.spec.image_prompt());
    let caption = format_caption(&output.spec).unwrap_or_default();
    println!("\n{}\n", caption);

    for (index, image) in output.images.iter().enumerate() {
        println!(
            "variation {}: {} bytes, {:?}",
            index + 1,
            image.bytes.len(),
            image.verification
        );
        store
            .save_asset(SavedAsset::new(&output.spec, image, caption.clone()))
            .await?;
    }

    history.record(&output.spec);
    store.save_history(&history).await?;
    println!("saved assets: {}", store.saved_assets().await?.len());
    Ok(())
}
