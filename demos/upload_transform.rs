//! Transform a local image without generating one first: the upload skips
//! stage 1, so only the OpenAI credential is needed.
//!
//! Usage: `cargo run --example upload_transform -- path/to/image.png`

use image_pair_queue::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let openai_key = std::env::var("OPENAI_API_KEY")?;
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "input.png".to_string());
    let bytes = std::fs::read(&path)?;

    let config = QueueConfig::builder()
        .with_credentials(Credentials::transform_only(&openai_key))
        .build();
    let queue = GenerationQueue::new(
        LetzAiClient::new(""),
        OpenAiImageClient::new(&openai_key),
        config,
    );
    let mut events = queue.subscribe();

    queue.enqueue(PairRequest::from_upload(
        UploadedImage::new("image/png", bytes),
        "repaint this as a watercolor",
    ))?;

    while let Ok(event) = events.recv().await {
        match event {
            QueueEvent::ItemUpdated { item } => println!("{:?}: {}", item.status, item.status_message),
            QueueEvent::ItemCompleted { .. } => {
                println!("transform complete");
                break;
            }
            QueueEvent::ItemFailed { error, .. } => {
                eprintln!("transform failed: {}", error);
                break;
            }
        }
    }

    Ok(())
}
