use std::env;
use std::time::Duration;

/// Pause after the spec stage before any image request.
pub const PLANNING_COOLDOWN: Duration = Duration::from_secs(4);
/// Pause before every image variation after the first.
pub const VARIATION_COOLDOWN: Duration = Duration::from_secs(8);
/// Pause after a rate-limit signal.
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(5);
/// Pause after any other failed image attempt.
pub const TRANSIENT_ERROR_DELAY: Duration = Duration::from_secs(2);
pub const MAX_IMAGE_ATTEMPTS: u32 = 2;
pub const MAX_VERIFY_CYCLES: u32 = 4;

/// Pacing and retry policy for one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub planning_cooldown: Duration,
    pub variation_cooldown: Duration,
    pub rate_limit_cooldown: Duration,
    pub transient_error_delay: Duration,
    pub max_image_attempts: u32,
    pub max_verify_cycles: u32,
    /// Run the OCR verify-and-correct loop on accepted images.
    pub verify_text: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            planning_cooldown: PLANNING_COOLDOWN,
            variation_cooldown: VARIATION_COOLDOWN,
            rate_limit_cooldown: RATE_LIMIT_COOLDOWN,
            transient_error_delay: TRANSIENT_ERROR_DELAY,
            max_image_attempts: MAX_IMAGE_ATTEMPTS,
            max_verify_cycles: MAX_VERIFY_CYCLES,
            verify_text: false,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same budgets, no waiting. Intended for tests and offline runs.
    pub fn immediate() -> Self {
        PipelineConfig {
            planning_cooldown: Duration::ZERO,
            variation_cooldown: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
            transient_error_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_millis("MANTRA_PLANNING_COOLDOWN_MS") {
            config.planning_cooldown = ms;
        }
        if let Some(ms) = env_millis("MANTRA_VARIATION_COOLDOWN_MS") {
            config.variation_cooldown = ms;
        }
        if let Some(ms) = env_millis("MANTRA_RATE_LIMIT_COOLDOWN_MS") {
            config.rate_limit_cooldown = ms;
        }
        if let Some(ms) = env_millis("MANTRA_TRANSIENT_ERROR_DELAY_MS") {
            config.transient_error_delay = ms;
        }
        config.verify_text = env_flag("MANTRA_VERIFY_TEXT", false);
        config
    }

    pub fn with_verify_text(mut self, enabled: bool) -> Self {
        self.verify_text = enabled;
        self
    }

    pub fn with_max_image_attempts(mut self, attempts: u32) -> Self {
        self.max_image_attempts = attempts.max(1);
        self
    }

    pub fn with_max_verify_cycles(mut self, cycles: u32) -> Self {
        self.max_verify_cycles = cycles.max(1);
        self
    }

    pub fn with_cooldowns(
        mut self,
        planning: Duration,
        variation: Duration,
        rate_limit: Duration,
        transient: Duration,
    ) -> Self {
        self.planning_cooldown = planning;
        self.variation_cooldown = variation;
        self.rate_limit_cooldown = rate_limit;
        self.transient_error_delay = transient;
        self
    }
}

/// `1`, `true`, `yes` and `on` (any case) enable a flag; anything else disables it.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn env_flag(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |value| parse_flag(&value))
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub text_model: String,
    pub image_model: String,
    pub vision_model: String,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        BedrockConfig {
            region: None,
            access_key: None,
            secret_key: None,
            text_model: "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
            image_model: "amazon.titan-image-generator-v2:0".to_string(),
            vision_model: "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
        }
    }
}

impl BedrockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        BedrockConfig {
            region: env::var("AWS_REGION")
                .or_else(|_| env::var("AWS_DEFAULT_REGION"))
                .ok(),
            access_key: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            text_model: env::var("MANTRA_TEXT_MODEL").unwrap_or(defaults.text_model),
            image_model: env::var("MANTRA_IMAGE_MODEL").unwrap_or(defaults.image_model),
            vision_model: env::var("MANTRA_VISION_MODEL").unwrap_or(defaults.vision_model),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_models(
        mut self,
        text_model: impl Into<String>,
        image_model: impl Into<String>,
        vision_model: impl Into<String>,
    ) -> Self {
        self.text_model = text_model.into();
        self.image_model = image_model.into();
        self.vision_model = vision_model.into();
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpstashConfig {
    pub url: Option<String>,
    pub token: Option<String>,
}

impl UpstashConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(mut self, url: impl Into<String>, token: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self.token = Some(token.into());
        self
    }

    pub fn from_env() -> Self {
        let url = env::var("UPSTASH_REDIS_REST_URL").ok();
        let token = env::var("UPSTASH_REDIS_REST_TOKEN").ok();

        UpstashConfig { url, token }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.token.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub bedrock: BedrockConfig,
    pub upstash: Option<UpstashConfig>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let upstash = UpstashConfig::from_env();
        Config {
            pipeline: PipelineConfig::from_env(),
            bedrock: BedrockConfig::from_env(),
            upstash: upstash.is_configured().then_some(upstash),
        }
    }

    pub fn with_pipeline(mut self, config: PipelineConfig) -> Self {
        self.pipeline = config;
        self
    }

    pub fn with_bedrock(mut self, config: BedrockConfig) -> Self {
        self.bedrock = config;
        self
    }

    pub fn with_upstash(mut self, config: UpstashConfig) -> Self {
        self.upstash = Some(config);
        self
    }
}
