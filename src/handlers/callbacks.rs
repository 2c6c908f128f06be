use std::error::Error;
use teloxide::prelude::*;

use crate::bot_state::BotState;
use crate::flows::{self, garage, profile, CallbackAction, FlowEvent};
use crate::handlers::utils::{car_fields_keyboard, send_replies};
use crate::rate_limit::{RateCategory, RATE_LIMIT_MESSAGE};

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if let Some(data) = q.data.as_deref() {
        if let Some(ref message) = q.message {
            let chat_id = message.chat().id;

            if !state.limiter.check(chat_id, RateCategory::Callback).await {
                bot.send_message(chat_id, RATE_LIMIT_MESSAGE).await?;
                return Ok(());
            }

            match CallbackAction::parse(data) {
                // кнопки, открывающие правку, сами стартуют сценарий
                Some(CallbackAction::EditProfileField(field)) => {
                    let result = profile::start_edit(&state, chat_id, field).await;
                    let replies = flows::recover(&state, chat_id, result).await;
                    send_replies(&bot, &state, chat_id, replies).await?;
                }
                Some(CallbackAction::CarMenu(car_id)) => {
                    bot.send_message(chat_id, "Что меняем?")
                        .reply_markup(car_fields_keyboard(car_id))
                        .await?;
                }
                Some(CallbackAction::EditCarField(car_id, field)) => {
                    let result = garage::start_edit(&state, chat_id, car_id, field).await;
                    let replies = flows::recover(&state, chat_id, result).await;
                    send_replies(&bot, &state, chat_id, replies).await?;
                }
                Some(CallbackAction::Noop) => {}
                // остальное — управление активным сценарием
                Some(action) => {
                    match flows::handle_event(&state, chat_id, FlowEvent::Action(action)).await {
                        Some(replies) => send_replies(&bot, &state, chat_id, replies).await?,
                        None => {
                            log::debug!("Flow action from {} without active session", chat_id);
                        }
                    }
                }
                None => {
                    log::warn!("Unknown callback token from {}: {}", chat_id, data);
                }
            }
        }
    }

    Ok(())
}
