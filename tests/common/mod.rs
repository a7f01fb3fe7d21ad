#![allow(dead_code)]

use async_trait::async_trait;
use mantra_gen::{
    DimensionDecoder, ImageGenerator, ImageTranscriber, ServiceError, ServiceResult, TextGenerator,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Fake "image": its bytes are the literal text `WIDTHxHEIGHT`.
pub fn fake_image(width: u32, height: u32) -> Vec<u8> {
    format!("{}x{}", width, height).into_bytes()
}

pub fn tall() -> Vec<u8> {
    fake_image(1080, 1920)
}

pub fn wide() -> Vec<u8> {
    fake_image(1920, 1080)
}

pub struct SizeDecoder;

impl DimensionDecoder for SizeDecoder {
    fn dimensions(&self, image: &[u8]) -> ServiceResult<(u32, u32)> {
        let text = std::str::from_utf8(image).map_err(|e| ServiceError::DecodeError(e.to_string()))?;
        let (w, h) = text
            .split_once('x')
            .ok_or_else(|| ServiceError::DecodeError(format!("not a fake image: {}", text)))?;
        let parse = |v: &str| v.parse::<u32>().map_err(|e| ServiceError::DecodeError(e.to_string()));
        Ok((parse(w)?, parse(h)?))
    }
}

pub struct ScriptedText {
    replies: Mutex<VecDeque<ServiceResult<String>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedText {
    pub fn new(replies: Vec<ServiceResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedText {
    async fn generate(&self, _system: &str, user_prompt: &str, _schema: &Value) -> ServiceResult<String> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::ResponseError("no scripted reply left".into())))
    }
}

/// Returns scripted results in order, then repeats `fallback`.
pub struct ScriptedImages {
    replies: Mutex<VecDeque<ServiceResult<Vec<u8>>>>,
    fallback: Vec<u8>,
    pub generate_calls: Mutex<Vec<(String, String)>>,
    pub edit_calls: Mutex<Vec<String>>,
    edit_result: Vec<u8>,
}

impl ScriptedImages {
    pub fn new(replies: Vec<ServiceResult<Vec<u8>>>, fallback: Vec<u8>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback,
            generate_calls: Mutex::new(Vec::new()),
            edit_calls: Mutex::new(Vec::new()),
            edit_result: tall(),
        }
    }

    pub fn always(image: Vec<u8>) -> Self {
        Self::new(Vec::new(), image)
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedImages {
    async fn generate(&self, prompt_payload: &str, aspect_ratio: &str) -> ServiceResult<Vec<u8>> {
        self.generate_calls
            .lock()
            .unwrap()
            .push((prompt_payload.to_string(), aspect_ratio.to_string()));
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    async fn edit(&self, _image: &[u8], instruction: &str) -> ServiceResult<Vec<u8>> {
        self.edit_calls.lock().unwrap().push(instruction.to_string());
        Ok(self.edit_result.clone())
    }
}

pub struct FixedOcr(pub String);

#[async_trait]
impl ImageTranscriber for FixedOcr {
    async fn transcribe(&self, _image: &[u8], _instruction: &str) -> ServiceResult<String> {
        Ok(self.0.clone())
    }
}
