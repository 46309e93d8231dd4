// SPDX-License-Identifier: MIT OR Apache-2.0
//! Minimal client-eval usage against a real FeatureHub edge.
//!
//! Run with `FEATUREHUB_EDGE_URL` and `FEATUREHUB_API_KEY` set, e.g.:
//! `FEATUREHUB_EDGE_URL=https://edge.featurehub.io FEATUREHUB_API_KEY=*default cargo run -p featurehub-demo-basic-usage`

use featurehub_client::{Config, Context};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let edge_url = std::env::var("FEATUREHUB_EDGE_URL")
        .unwrap_or_else(|_| "https://edge.featurehub.io".to_string());
    let api_key =
        std::env::var("FEATUREHUB_API_KEY").unwrap_or_else(|_| "*default".to_string());

    let config = Config::new(edge_url, vec![api_key])?;
    config.init().await?;

    let Some(Context::Client(ctx)) = config.new_context() else {
        return Err("expected a client-eval key (containing '*')".into());
    };

    ctx.user_key("demo-user").country("NZ").build().await?;

    let holder = ctx.feature("NEW_CHECKOUT");
    println!("NEW_CHECKOUT enabled: {}", holder.is_enabled());
    println!("repository ready: {}", config.repository().is_some());

    config.close().await;
    Ok(())
}
