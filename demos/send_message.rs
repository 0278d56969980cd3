//! Sends a text message and a reply button prompt.
//!
//! ```sh
//! WHATSAPP_ACCESS_TOKEN=... WHATSAPP_PHONE_NUMBER_ID=... \
//!     cargo run --example send_message -- 16315551234
//! ```

use anyhow::Context;
use wacloud::api::messages::interactive;
use wacloud::WhatsAppClient;

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

    let to = std::env::args()
        .nth(1)
        .context("usage: send_message <recipient>")?;

    let client = WhatsAppClient::from_env().context("failed to load client config")?;

    let sent = client.send_text(&to, "Hello from wacloud").await?;
    tracing::info!(message_id = ?sent.message_id(), "Text sent");

    let prompt = interactive::reply_buttons(
        "Did this arrive?",
        &[("yes", "Yes"), ("no", "No")],
    );
    match client.send_interactive(&to, prompt).await {
        Ok(sent) => tracing::info!(message_id = ?sent.message_id(), "Buttons sent"),
        Err(e) => {
            // Display carries the diagnostic details and solution when known
            tracing::error!("Send failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
