use anyhow::Context;

use mealmind_client::meals::MealSlot;
use mealmind_client::{ClientConfig, NutritionSession, SessionContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "mealmind_client=debug".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let mut args = std::env::args().skip(1);
    let slot: MealSlot = args
        .next()
        .context("usage: mealmind-client <breakfast|lunch|dinner|snacks> [query...]")?
        .parse()
        .map_err(anyhow::Error::msg)?;
    let query = args.collect::<Vec<_>>().join(" ");

    let config = ClientConfig::from_env()?;
    tracing::info!(base_url = %config.base_url, meal = %slot, "opening session");
    let ctx = SessionContext::init(config, slot)?;
    let session = NutritionSession::new(ctx);

    if let Err(e) = session.refresh_all().await {
        tracing::error!(error = %e, "could not load current meal");
    }
    if !query.trim().is_empty() {
        if let Err(e) = session.search(&query).await {
            tracing::error!(error = %e, %query, "search failed");
        }
    }

    let view = session.view().await;
    println!("{}", serde_json::to_string_pretty(&view)?);

    session.shutdown().await;
    Ok(())
}
