pub mod classify;
pub mod image_client;

pub use classify::classify_rejection;
pub use image_client::ImageClient;

use async_trait::async_trait;

use crate::{
    error::GenerationFailure,
    models::{GeneratedImage, GenerationRequest},
};

/// Seam between the lifecycle controller and the generation service, so the
/// controller can be driven by scripted fakes in tests.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedImage, GenerationFailure>;
}

#[async_trait]
impl ImageGenerator for ImageClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedImage, GenerationFailure> {
        ImageClient::generate(self, request).await
    }
}
