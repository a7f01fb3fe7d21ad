use mantra_gen::config::env_flag;
use mantra_gen::{
    format_caption, logger, BedrockService, Config, GenerationMode, GenerationOptions,
    GenerationPipeline, HistoryStore, ImageCount, QuoteInputs, SavedAsset, TextVerification,
};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// File name stem for a spec id, which may come from model or caller JSON.
fn file_stem(spec_id: &str) -> String {
    let stem: String = spec_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(64)
        .collect();
    if stem.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        stem
    }
}

fn options_from_env() -> GenerationOptions {
    let count = env::var("MANTRA_IMAGE_COUNT")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .map(ImageCount::from_count)
        .unwrap_or_default();

    let options = GenerationOptions::new()
        .with_image_prompt(env_flag("MANTRA_WANT_IMAGE_PROMPT", true))
        .with_video_prompt(env_flag("MANTRA_WANT_VIDEO_PROMPT", true))
        .with_caption(env_flag("MANTRA_WANT_CAPTION", true));

    if env_flag("MANTRA_WANT_IMAGE", true) {
        options.with_images(count)
    } else {
        options.without_images()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(logger::LoggerConfig::from_env())?;
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env();
    logger::log_config_info(&config);

    let mode_raw = env::var("MANTRA_MODE").unwrap_or_else(|_| "AUTO".to_string());
    let mode = GenerationMode::parse(&mode_raw)
        .ok_or_else(|| format!("Unknown MANTRA_MODE '{}'", mode_raw))?;
    let inputs = QuoteInputs {
        quote: env::var("MANTRA_QUOTE").unwrap_or_default(),
        author: env::var("MANTRA_AUTHOR").unwrap_or_default(),
        source: env::var("MANTRA_SOURCE").unwrap_or_default(),
    };
    let json_input = match env::var("MANTRA_JSON_FILE") {
        Ok(path) if mode.is_direct_json() => fs::read_to_string(&path)
            .map_err(|e| format!("Cannot read MANTRA_JSON_FILE {}: {}", path, e))?,
        _ => String::new(),
    };
    let aspect_ratio = env::var("MANTRA_ASPECT_RATIO").unwrap_or_else(|_| "9:16".to_string());
    let output_dir = PathBuf::from(env::var("MANTRA_OUTPUT_DIR").unwrap_or_else(|_| "output".to_string()));
    let options = options_from_env();

    log::info!("🔄 Creating Bedrock service...");
    let service = match BedrockService::new(config.bedrock.clone()).await {
        Ok(service) => Arc::new(service),
        Err(e) => {
            log::error!("❌ Failed to initialize Bedrock service: {}", e);
            return Err(e.into());
        }
    };

    let pipeline = GenerationPipeline::new(service.clone(), service.clone())
        .with_transcriber(service)
        .with_config(config.pipeline.clone());

    let store = HistoryStore::from_config(&config).await?;
    let mut history = match store.load_history().await {
        Ok(history) => history,
        Err(e) => {
            log::warn!("⚠️  Could not load history, starting fresh: {}", e);
            Default::default()
        }
    };

    let on_progress = |message: &str| println!("▶ {}", message);
    let output = match pipeline
        .run(mode, &inputs, &json_input, &aspect_ratio, &history, &on_progress, &options)
        .await
    {
        Ok(output) => output,
        Err(e) => {
            log::error!("❌ Generation failed: {}", e);
            return Err(e.into());
        }
    };

    fs::create_dir_all(&output_dir)?;
    let spec = &output.spec;
    let stem = file_stem(&spec.spec_id);
    let spec_path = output_dir.join(format!("{}.json", stem));
    fs::write(&spec_path, serde_json::to_string_pretty(spec)?)?;
    log::info!("📄 Spec written to {}", spec_path.display());

    let caption = format_caption(spec);
    if let Some(caption) = &caption {
        println!("\n{}\n", caption);
    }

    for (index, image) in output.images.iter().enumerate() {
        let image_path = output_dir.join(format!("{}-{}.png", stem, index + 1));
        fs::write(&image_path, &image.bytes)?;
        match &image.verification {
            TextVerification::Verified { cycles, .. } => {
                log::info!("🖼️  {} (text verified after {} cycle(s))", image_path.display(), cycles)
            }
            TextVerification::Unverified { reason, .. } => {
                log::warn!("🖼️  {} (text not verified: {})", image_path.display(), reason)
            }
            TextVerification::Skipped => log::info!("🖼️  {}", image_path.display()),
        }

        let asset = SavedAsset::new(spec, image, caption.clone().unwrap_or_default());
        if let Err(e) = store.save_asset(asset).await {
            log::warn!("⚠️  Could not save asset: {}", e);
        }
    }

    history.record(spec);
    if let Err(e) = store.save_history(&history).await {
        log::warn!("⚠️  Could not save history: {}", e);
    }

    log::info!("🎉 Done: {} image(s) for spec {}", output.images.len(), spec.spec_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_cannot_leave_output_dir() {
        assert_eq!(file_stem("../../etc/passwd"), "etcpasswd");
        assert_eq!(file_stem("a/b\\c"), "abc");
        assert_eq!(
            file_stem("0b6f1c3e-9a2d-4f55-8d0e-3c1f2a7b9e10"),
            "0b6f1c3e-9a2d-4f55-8d0e-3c1f2a7b9e10"
        );
    }

    #[test]
    fn empty_stem_falls_back_to_fresh_id() {
        let stem = file_stem("../..");
        assert!(uuid::Uuid::parse_str(&stem).is_ok());
    }
}
