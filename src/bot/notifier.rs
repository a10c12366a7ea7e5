use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::LinkPreviewOptions;

use crate::error::{ AppError, Result };
use crate::providers::Notifier;

/// Delivers alert notifications through the Telegram Bot API. User ids
/// are Telegram chat ids rendered as strings.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, user_id: &str, text: &str, disable_link_preview: bool) -> Result<()> {
        let chat_id = user_id
            .parse::<i64>()
            .map_err(|_| AppError::Notification(format!("Invalid chat id: {}", user_id)))?;

        let mut request = self.bot.send_message(ChatId(chat_id), text);

        if disable_link_preview {
            request = request.link_preview_options(LinkPreviewOptions {
                is_disabled: true,
                url: None,
                prefer_small_media: false,
                prefer_large_media: false,
                show_above_text: false,
            });
        }

        request.await.map_err(|e| AppError::Notification(e.to_string()))?;

        Ok(())
    }
}
