use async_trait::async_trait;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use storyvis::{
    AspectRatio, CredentialGate, CredentialHost, DebugOverlay, DiagnosticBus, GeminiConfig,
    ImageClient, ResourceController, ResourceState, VisualParams,
};

/// Demo host capability backed by the environment: the "selected
/// credential" is simply whether GEMINI_API_KEY is set.
struct EnvHost;

#[async_trait]
impl CredentialHost for EnvHost {
    async fn has_selected_credential(&self) -> storyvis::Result<bool> {
        Ok(env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .map(|key| key.len() > 5)
            .unwrap_or(false))
    }

    async fn open_select_credential(&self) -> storyvis::Result<()> {
        println!("Set GEMINI_API_KEY in your environment or .env file, then retry.");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match dotenv::dotenv() {
        Ok(_) => log::info!(".env file loaded"),
        Err(_) => log::warn!("No .env file found, using system environment variables"),
    }

    storyvis::logger::init_with_config(
        storyvis::logger::LoggerConfig::development().with_prefix("storyvis"),
    )?;

    let bus = DiagnosticBus::with_default_capacity();
    let gate = CredentialGate::with_host(Arc::new(EnvHost));
    let config = GeminiConfig::from_env()
        .with_style_preamble("Professional lifestyle photography, bright natural lighting, soft colors.");
    let client = Arc::new(ImageClient::new(config)?);

    let overlay = DebugOverlay::new(bus.clone(), gate.clone());
    overlay.spawn_poller();
    overlay.open();

    // One controller per visual placeholder on the page.
    let placeholders = [
        ("hero", "a woman sitting peacefully on grass at sunset", AspectRatio::Wide),
        ("story-1", "morning light through a kitchen window", AspectRatio::Portrait),
        ("story-2", "a quiet forest path after rain", AspectRatio::Landscape),
    ];

    let mut controllers = Vec::new();
    for (label, prompt, aspect_ratio) in placeholders {
        let controller = ResourceController::new(
            label,
            VisualParams::new(prompt, aspect_ratio),
            gate.clone(),
            client.clone(),
            bus.clone(),
        );
        controller.activate().await;
        controllers.push(controller);
    }

    for controller in &controllers {
        let snapshot = controller.snapshot();
        match &snapshot.state {
            ResourceState::Ready(image) => {
                let path = format!("{}.png", controller.label());
                std::fs::write(&path, &image.image_data)?;
                log::info!("[{}] wrote {} bytes to {}", controller.label(), image.image_data.len(), path);
            }
            ResourceState::NeedsCredential => {
                log::warn!("[{}] needs a credential; opening selection flow", controller.label());
                controller.request_credential().await;
            }
            ResourceState::Errored(message) => {
                log::error!("[{}] {}", controller.label(), message);
                controller.retry().await;
            }
            other => log::info!("[{}] state: {}", controller.label(), other.name()),
        }
    }

    // Let the overlay poller take one more reading before rendering.
    tokio::time::sleep(Duration::from_secs(3)).await;
    println!("{}", overlay.view());

    for controller in &controllers {
        controller.dispose();
    }
    Ok(())
}
