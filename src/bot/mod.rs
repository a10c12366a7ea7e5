pub mod commands;
pub mod handlers;
pub mod notifier;

use std::sync::Arc;

use teloxide::dispatching::{ UpdateFilterExt, UpdateHandler };
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::db::AlertRepository;
use crate::services::{ PriceAlertService, TokenIndex };

pub use notifier::TelegramNotifier;

#[derive(Clone)]
pub struct BotState {
    pub price_alert_service: Arc<PriceAlertService>,
    pub repository: Arc<AlertRepository>,
    pub token_index: Arc<TokenIndex>,
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    let command_handler = Update::filter_message()
        .filter_command::<commands::Command>()
        .endpoint(handlers::handle_command_dispatch);

    dptree::entry().branch(command_handler)
}

pub async fn run_bot(
    bot: Bot,
    price_alert_service: Arc<PriceAlertService>,
    repository: Arc<AlertRepository>,
    token_index: Arc<TokenIndex>
) {
    tracing::info!("Starting Telegram bot...");

    // Set bot commands for slash menu
    if let Err(e) = bot.set_my_commands(commands::Command::bot_commands()).await {
        tracing::warn!("Failed to set bot commands: {}", e);
    }

    let state = Arc::new(BotState {
        price_alert_service,
        repository,
        token_index,
    });

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch().await;
}
