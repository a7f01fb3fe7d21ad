use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageCount {
    One,
    Two,
}

impl ImageCount {
    pub fn get(&self) -> usize {
        match self {
            ImageCount::One => 1,
            ImageCount::Two => 2,
        }
    }

    /// Anything above one is clamped to two.
    pub fn from_count(count: usize) -> Self {
        if count >= 2 {
            ImageCount::Two
        } else {
            ImageCount::One
        }
    }
}

impl Default for ImageCount {
    fn default() -> Self {
        ImageCount::Two
    }
}

/// Which outputs a run should populate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationOptions {
    pub want_image_prompt: bool,
    pub want_video_prompt: bool,
    pub want_caption: bool,
    pub want_image: bool,
    pub image_count: ImageCount,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        GenerationOptions {
            want_image_prompt: true,
            want_video_prompt: true,
            want_caption: true,
            want_image: true,
            image_count: ImageCount::Two,
        }
    }
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nothing requested; enable outputs with the `with_*` builders.
    pub fn none() -> Self {
        GenerationOptions {
            want_image_prompt: false,
            want_video_prompt: false,
            want_caption: false,
            want_image: false,
            image_count: ImageCount::One,
        }
    }

    pub fn with_image_prompt(mut self, enabled: bool) -> Self {
        self.want_image_prompt = enabled;
        self
    }

    pub fn with_video_prompt(mut self, enabled: bool) -> Self {
        self.want_video_prompt = enabled;
        self
    }

    pub fn with_caption(mut self, enabled: bool) -> Self {
        self.want_caption = enabled;
        self
    }

    pub fn with_images(mut self, count: ImageCount) -> Self {
        self.want_image = true;
        self.image_count = count;
        self
    }

    pub fn without_images(mut self) -> Self {
        self.want_image = false;
        self
    }

    /// Caller-side contract: at least one output must be requested.
    pub fn has_any_output(&self) -> bool {
        self.want_image_prompt || self.want_video_prompt || self.want_caption || self.want_image
    }
}
