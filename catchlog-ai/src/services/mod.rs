//! Service modules for catch analysis and storage

pub mod catch_uploader;
pub mod image_store;
pub mod presentation_renderer;
pub mod response_normalizer;
pub mod sanitizer;
pub mod vision_analyzer;

pub use catch_uploader::{CatchUploader, UploadError, UploadReceipt};
pub use image_store::{ImageError, ImageStore, StoredImage, UploadedImage, MAX_IMAGE_BYTES};
pub use presentation_renderer::render_analysis;
pub use response_normalizer::{
    NormalizeError, NormalizerObserver, ResponseNormalizer, TracingObserver,
};
pub use vision_analyzer::{GeminiClient, VisionAnalyzer, VisionError, DEFAULT_GEMINI_MODEL};
