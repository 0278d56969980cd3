//! Runs a signed webhook round trip through [`WebhookReceiver`] without a
//! network listener.

use std::collections::HashMap;
use std::time::Duration;
use wacloud::api::{InboundMessage, InboundStatus};
use wacloud::config::WebhookConfig;
use wacloud::webhook::sign_body;
use wacloud::{WebhookHandlers, WebhookReceiver};

const NOTIFICATION: &str = r#"{
    "object": "whatsapp_business_account",
    "entry": [{
        "id": "102290129340398",
        "changes": [{
            "field": "messages",
            "value": {
                "messaging_product": "whatsapp",
                "metadata": { "display_phone_number": "15550783881", "phone_number_id": "106540352242922" },
                "messages": [{
                    "from": "16505551234",
                    "id": "wamid.HBgLMTY1MDM4Nzk0MzkVAgASGBQzQTRBNjU5OUFFRTAzODEwMTQ0RgA=",
                    "timestamp": "1749416383",
                    "type": "text",
                    "text": { "body": "Does it come in another color?" }
                }],
                "statuses": [{
                    "id": "wamid.HBgLMTY0NjcwNDM1OTUVAgARGBI1RjQyNUE3NEYxMzAzMzQ5MkEA",
                    "status": "delivered",
                    "timestamp": "1749416400",
                    "recipient_id": "16505551234"
                }]
            }
        }]
    }]
}"#;

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,wacloud=debug"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = WebhookConfig::new(
        Some("demo-app-secret".to_string()),
        Some("demo-verify-token".to_string()),
    );

    let handlers = WebhookHandlers::new()
        .on_message(|message: InboundMessage| async move {
            tracing::info!(
                from = %message.from,
                kind = message.kind(),
                text = ?message.text(),
                received_at = ?message.received_at(),
                "Message received"
            );
        })
        .on_status(|status: InboundStatus| async move {
            tracing::info!(id = %status.id, status = ?status.status, "Status received");
        });

    let receiver = WebhookReceiver::new(config, handlers);

    let query: HashMap<String, String> = [
        ("hub.mode", "subscribe"),
        ("hub.verify_token", "demo-verify-token"),
        ("hub.challenge", "1158201444"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let handshake = receiver.handle_subscription(&query);
    tracing::info!(status = %handshake.status, body = %handshake.body, "Subscription");

    let signature = sign_body("demo-app-secret", NOTIFICATION.as_bytes());
    let accepted = receiver.handle_notification(Some(&signature), NOTIFICATION.as_bytes());
    tracing::info!(status = %accepted.status, report = ?accepted.report, "Signed notification");

    let rejected = receiver.handle_notification(Some("sha256=00"), NOTIFICATION.as_bytes());
    tracing::info!(status = %rejected.status, "Tampered notification");

    // Handlers run on spawned tasks
    tokio::time::sleep(Duration::from_millis(50)).await;

    Ok(())
}
