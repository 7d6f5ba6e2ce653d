//! tdcompare-bot - Telegram front end for tdcompare.
//!
//! Wires the comparison pipeline to the Telegram Bot API: long polling for
//! commands and documents, replies and report attachments going back out.
//!
//! # Example
//!
//! ```ignore
//! use tdcompare_bot::{config::load_compare_config, run, BotConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run(BotConfig::from_env()?, load_compare_config()?).await
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod poller;
pub mod telegram;

#[cfg(test)]
mod testing;

pub use config::BotConfig;
pub use dispatcher::{Command, Dispatch, Dispatcher, FileSource, ShutdownHandle, UserSequencer};
pub use error::{BotError, BotResult};
pub use poller::{Poller, UpdateSource};
pub use telegram::TelegramClient;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tdcompare_core::{CompareConfig, ComparisonPipeline, SessionSweeper};
use tdcompare_llm::LlmFactory;
use tokio::signal;
use tracing::{error, info};

/// Resolve on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Run the bot until an admin `/stop` or a termination signal.
pub async fn run(bot: BotConfig, compare: CompareConfig) -> Result<()> {
    if compare.llm.api_key.is_none() {
        bail!("OPENAI_API_KEY is not set");
    }

    let llm = LlmFactory::create(compare.llm.clone()).context("create LLM provider")?;
    let client = Arc::new(TelegramClient::new(&bot).context("build Telegram client")?);
    let me = client.get_me().await.context("verify TELEGRAM_TOKEN")?;
    info!(
        bot_id = me.id,
        username = me.username.as_deref().unwrap_or(""),
        "Connected to Telegram"
    );

    let pipeline = Arc::new(
        ComparisonPipeline::from_config(&compare, llm, client.clone())
            .context("build comparison pipeline")?,
    );
    info!(
        model = %compare.llm.model,
        formats = ?compare.output_formats,
        default_locale = %compare.default_locale,
        "Comparison pipeline ready"
    );

    let mut sweeper = SessionSweeper::new(pipeline.sessions().clone(), compare.session)
        .await
        .context("create session sweeper")?;
    sweeper.start().await.context("start session sweeper")?;

    let shutdown = ShutdownHandle::new();
    let signals = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        signals.trigger();
    });

    let dispatcher = Arc::new(Dispatcher::new(
        pipeline,
        client.clone(),
        bot.admin_id,
        shutdown.clone(),
    ));
    Poller::new(client, dispatcher, bot.poll_timeout_secs)
        .run(shutdown.subscribe())
        .await;

    sweeper.shutdown().await.context("stop session sweeper")?;
    info!("Bot stopped cleanly");
    Ok(())
}
