use std::sync::Arc;

use webhook_notifier::{
    ClientConfig, Endpoint, HttpTransport, InMemoryDirectory, NotificationManager, SenderConfig,
    StagedSender,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let transport = HttpTransport::new(&ClientConfig::default())?;
    let sender = Arc::new(StagedSender::new(SenderConfig::default(), Arc::new(transport))?);

    let directory = Arc::new(InMemoryDirectory::new());
    directory
        .register(
            Endpoint::new("tenant_a", "https://example.com/webhook")
                .with_description("order events")
                .with_header("X-Api-Key", "supersecret"),
        )
        .await;

    let manager = NotificationManager::new(directory, sender.clone());
    let count = manager.notify("tenant_a", r#"{"id":123}"#).await?;
    println!("dispatched to {count} endpoint(s)");

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    sender.shutdown().await?;
    Ok(())
}
