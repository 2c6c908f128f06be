use std::error::Error;
use teloxide::prelude::*;

use crate::bot_state::BotState;
use crate::flows::{self, status, FlowEvent};
use crate::handlers::commands::{show_garage, show_profile};
use crate::handlers::utils::{main_menu_keyboard, send_replies};
use crate::rate_limit::{RateCategory, RATE_LIMIT_MESSAGE};

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = msg.chat.id;

    if let Some(text) = msg.text() {
        // команды уже разобраны в command_handler
        if text.starts_with('/') {
            return Ok(());
        }

        if !state.limiter.check(chat_id, RateCategory::General).await {
            bot.send_message(chat_id, RATE_LIMIT_MESSAGE).await?;
            return Ok(());
        }

        match text {
            "👤 Профиль" => show_profile(&bot, &state, chat_id).await?,
            "🚗 Мой гараж" => show_garage(&bot, &state, chat_id).await?,
            "🔍 Поиск" => {
                let replies = status::start_search(&state, chat_id).await;
                send_replies(&bot, &state, chat_id, replies).await?;
            }
            "ℹ️ Помощь" => {
                bot.send_message(chat_id, "Все команды — /help").await?;
            }
            _ => match flows::handle_event(&state, chat_id, FlowEvent::Text(text)).await {
                Some(replies) => send_replies(&bot, &state, chat_id, replies).await?,
                None => {
                    bot.send_message(chat_id, "Не понял 🤔 Выберите действие в меню или /help")
                        .reply_markup(main_menu_keyboard())
                        .await?;
                }
            },
        }
        return Ok(());
    }

    if let Some(photos) = msg.photo() {
        if !state.limiter.check(chat_id, RateCategory::General).await {
            bot.send_message(chat_id, RATE_LIMIT_MESSAGE).await?;
            return Ok(());
        }
        // Telegram присылает варианты размеров, берём самый крупный
        let Some(file_id) = photos.last().map(|p| p.file.id.clone()) else {
            return Ok(());
        };
        match flows::handle_event(&state, chat_id, FlowEvent::Photo(&file_id)).await {
            Some(replies) => send_replies(&bot, &state, chat_id, replies).await?,
            None => {
                bot.send_message(chat_id, "Красивое фото, но я сейчас его не жду 🙂")
                    .await?;
            }
        }
    }

    Ok(())
}
