//! Quote-image generation pipeline: a text model plans a JSON spec, the spec
//! is self-healed, images are produced under an aspect-ratio gate, and the
//! rendered quote is checked by OCR with bounded auto-correction.
//!
//! The generation backends are traits in [`service`]; [`bedrock`] provides an
//! AWS Bedrock implementation behind the `bedrock` feature.

#[cfg(feature = "bedrock")]
pub mod bedrock;
pub mod caption;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod repair;
pub mod schema;
pub mod service;
pub mod storage;
pub mod validator;
pub mod verify;

#[cfg(feature = "bedrock")]
pub use bedrock::BedrockService;
pub use caption::format_caption;
pub use config::{BedrockConfig, Config, PipelineConfig, UpstashConfig};
pub use error::{PipelineError, Result, ServiceError, ServiceResult};
pub use models::{
    AspectRatio, AssetSpec, GeneratedImage, GenerationMode, GenerationOptions, HistoryBuffer,
    ImageCount, PipelineOutput, QuoteInputs, SavedAsset, TextVerification,
};
pub use pipeline::{normalize_spec, GenerationPipeline};
pub use progress::{silent, ProgressFn};
pub use repair::{repair, RepairDiagnostic, RepairTier};
pub use service::{DimensionDecoder, ImageGenerator, ImageHeaderDecoder, ImageTranscriber, TextGenerator};
pub use storage::{HistoryStore, KeyValueStore, MemoryStore};
