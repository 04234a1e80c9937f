use image_pair_queue::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let letzai_key = std::env::var("LETZAI_API_KEY")?;
    let openai_key = std::env::var("OPENAI_API_KEY")?;

    let config = QueueConfig::builder()
        .with_credentials(Credentials::new(&letzai_key, &openai_key))
        .build();
    let queue = GenerationQueue::new(
        LetzAiClient::new(&letzai_key),
        OpenAiImageClient::new(&openai_key),
        config,
    );
    let mut events = queue.subscribe();

    queue.enqueue(
        PairRequest::from_prompt("a quiet room in an old house", "turn this into a tiny 3D world")
            .size(1024, 1024)
            .quality(QualityMode::Default),
    )?;

    while let Ok(event) = events.recv().await {
        match event {
            QueueEvent::ItemUpdated { item } => {
                println!("[{:>3}%] {:?}: {}", item.progress, item.status, item.status_message);
            }
            QueueEvent::ItemCompleted {
                sequence_number, ..
            } => {
                println!(
                    "done, export as {}.png / {}.png",
                    output_basename(sequence_number, PairSide::Start),
                    output_basename(sequence_number, PairSide::End),
                );
                break;
            }
            QueueEvent::ItemFailed { error, .. } => {
                eprintln!("generation failed: {}", error);
                break;
            }
        }
    }

    Ok(())
}
