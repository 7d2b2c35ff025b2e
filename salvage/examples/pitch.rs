//! Run one idea-pitch completion end to end against a real provider.
//!
//! Requires at least `SALVAGE_API_KEY_1` in the environment. Run with:
//!
//! ```sh
//! SALVAGE_API_KEY_1=gsk_... cargo run --example pitch
//! ```

use salvage::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let pipeline = Pipeline::from_env()?;
    let request = CompletionRequest::new(
        "Pitch one startup idea for developers who maintain open-source Rust crates. \
         Reply as a JSON object with fields: title, hook, value, evidence, differentiator, \
         call_to_action, score (1-10), mvp_effort (1-10), type.",
        SchemaId::IdeaPitch,
    );

    let outcome = pipeline.process(&request).await;
    for entry in outcome.trail.entries() {
        println!("[{}] {}", entry.at.format("%H:%M:%S%.3f"), entry.stage);
    }
    match outcome.record {
        Ok(record) => {
            println!("\n{}", serde_json::to_string_pretty(record.fields())?);
            for note in record.notes() {
                println!("note: {note}");
            }
        }
        Err(error) => {
            eprintln!("unrecoverable: {error}");
            std::process::exit(1);
        }
    }
    if let Some(total) = outcome.usage.total_tokens {
        println!("tokens used: {total}");
    }
    Ok(())
}
