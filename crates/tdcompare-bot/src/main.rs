//! tdcompare-bot - Telegram bot binary.
//!
//! # Configuration
//!
//! - `TELEGRAM_TOKEN` - Bot API token (required)
//! - `OPENAI_API_KEY` - Model provider key (required)
//! - `ADMIN_ID` - Telegram user id allowed to `/stop` the bot (required)
//! - `TDC_CONFIG` - Optional `.toml`/`.json`/`.yaml` comparison settings
//! - `RUST_LOG` - Log filter, defaults to `info`

use anyhow::{Context, Result};
use tdcompare_bot::{config::load_compare_config, run, BotConfig};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("tdcompare=debug".parse()?),
        )
        .init();

    let bot = BotConfig::from_env().context("load bot configuration")?;
    let compare = load_compare_config().context("load comparison configuration")?;

    run(bot, compare).await
}
