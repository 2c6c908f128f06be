use std::error::Error;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot_state::BotState;
use crate::flows::{self, garage, invitation, registration, status, CallbackAction, FlowEvent};
use crate::handlers::utils::{
    garage_keyboard, main_menu_keyboard, member_card, profile_edit_keyboard, send_replies,
};
use crate::rate_limit::{category_for, RATE_LIMIT_MESSAGE};
use crate::Command;

const DB_DOWN_MESSAGE: &str = "😔 База сейчас недоступна, попробуйте позже";

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = msg.chat.id;

    if !state.limiter.check(chat_id, category_for(&cmd)).await {
        bot.send_message(chat_id, RATE_LIMIT_MESSAGE).await?;
        return Ok(());
    }

    match cmd {
        Command::Start => handle_start(&bot, chat_id).await?,
        Command::Help => handle_help(&bot, chat_id).await?,
        Command::Reg => {
            let username = msg.from.as_ref().and_then(|u| u.username.clone());
            let result = registration::start(&state, chat_id, username.as_deref()).await;
            let replies = flows::recover(&state, chat_id, result).await;
            send_replies(&bot, &state, chat_id, replies).await?;
        }
        Command::Addcar => {
            let result = garage::start_add(&state, chat_id).await;
            let replies = flows::recover(&state, chat_id, result).await;
            send_replies(&bot, &state, chat_id, replies).await?;
        }
        Command::Invite => {
            // из личного чата приглашение можно разослать в клубный
            let broadcast = msg.chat.is_private();
            let result = invitation::start(&state, chat_id, broadcast).await;
            let replies = flows::recover(&state, chat_id, result).await;
            send_replies(&bot, &state, chat_id, replies).await?;
        }
        Command::Profile => show_profile(&bot, &state, chat_id).await?,
        Command::Garage => show_garage(&bot, &state, chat_id).await?,
        Command::Search => {
            let replies = status::start_search(&state, chat_id).await;
            send_replies(&bot, &state, chat_id, replies).await?;
        }
        Command::Activate => {
            let result = status::start_activate(&state, chat_id).await;
            let replies = flows::recover(&state, chat_id, result).await;
            send_replies(&bot, &state, chat_id, replies).await?;
        }
        Command::Cancel => {
            let event = FlowEvent::Action(CallbackAction::Cancel);
            match flows::handle_event(&state, chat_id, event).await {
                Some(replies) => send_replies(&bot, &state, chat_id, replies).await?,
                None => {
                    bot.send_message(chat_id, "Сейчас нечего отменять").await?;
                }
            }
        }
        Command::Setstatus => {
            if !state.is_admin(chat_id) {
                bot.send_message(chat_id, "Команда доступна только админам").await?;
                return Ok(());
            }
            let replies = status::start_set_status(&state, chat_id).await;
            send_replies(&bot, &state, chat_id, replies).await?;
        }
        Command::Setpassword => {
            if !state.is_admin(chat_id) {
                bot.send_message(chat_id, "Команда доступна только админам").await?;
                return Ok(());
            }
            let replies = status::start_set_password(&state, chat_id).await;
            send_replies(&bot, &state, chat_id, replies).await?;
        }
        Command::Resetlimits => {
            if !state.is_admin(chat_id) {
                bot.send_message(chat_id, "Команда доступна только админам").await?;
                return Ok(());
            }
            let target = msg
                .text()
                .and_then(|t| t.split_whitespace().nth(1))
                .and_then(|t| t.parse::<i64>().ok());
            match target {
                Some(tg_id) => {
                    state.limiter.reset(ChatId(tg_id)).await;
                    log::info!("🧹 Rate limits reset for {} by admin {}", tg_id, chat_id);
                    bot.send_message(chat_id, format!("Лимиты для {} сброшены", tg_id))
                        .await?;
                }
                None => {
                    bot.send_message(chat_id, "Формат: /resetlimits <телеграм-id>")
                        .await?;
                }
            }
        }
    }
    Ok(())
}

async fn handle_start(bot: &Bot, chat_id: ChatId) -> Result<(), Box<dyn Error + Send + Sync>> {
    let text = "👋 Привет! Это бот автоклуба\n\n\
        Я веду реестр участников и их машин, помогаю приглашать в клуб \
        владельцев интересных автомобилей, замеченных на улице\n\n\
        📋 Основные команды:\n\
        /reg — регистрация в клубе\n\
        /addcar — добавить автомобиль\n\
        /invite — пригласить владельца по госномеру\n\
        /profile — мой профиль\n\
        /garage — мой гараж\n\
        /search — поиск машины по номеру\n\
        /activate — активация статуса по паролю с встречи\n\
        /cancel — отменить текущее действие";
    bot.send_message(chat_id, text)
        .reply_markup(main_menu_keyboard())
        .await?;
    Ok(())
}

async fn handle_help(bot: &Bot, chat_id: ChatId) -> Result<(), Box<dyn Error + Send + Sync>> {
    let text = "ℹ️ Как это работает\n\n\
        1. Зарегистрируйтесь: /reg\n\
        2. Добавьте машину: /addcar — и вы участник\n\
        3. Увидели интересную машину без клубной наклейки? /invite — \
        оставьте номер и фото, клуб найдёт владельца\n\
        4. Были на встрече? Узнайте пароль и поднимите статус: /activate\n\n\
        Любой сценарий можно прервать командой /cancel или кнопкой «Отмена»";
    bot.send_message(chat_id, text).await?;
    Ok(())
}

pub async fn show_profile(
    bot: &Bot,
    state: &BotState,
    chat_id: ChatId,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match state.store.get_member_by_tg_id(chat_id.0).await {
        Ok(Some(member)) => {
            bot.send_message(chat_id, member_card(&member))
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(profile_edit_keyboard())
                .await?;
        }
        Ok(None) => {
            bot.send_message(chat_id, "Вы ещё не зарегистрированы, команда /reg")
                .await?;
        }
        Err(e) => {
            log::error!("❌ Profile fetch failed for {}: {}", chat_id, e);
            bot.send_message(chat_id, DB_DOWN_MESSAGE).await?;
        }
    }
    Ok(())
}

pub async fn show_garage(
    bot: &Bot,
    state: &BotState,
    chat_id: ChatId,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let member = match state.store.get_member_by_tg_id(chat_id.0).await {
        Ok(Some(member)) => member,
        Ok(None) => {
            bot.send_message(chat_id, "Вы ещё не зарегистрированы, команда /reg")
                .await?;
            return Ok(());
        }
        Err(e) => {
            log::error!("❌ Garage fetch failed for {}: {}", chat_id, e);
            bot.send_message(chat_id, DB_DOWN_MESSAGE).await?;
            return Ok(());
        }
    };
    match state.store.get_cars_by_member(member.id).await {
        Ok(cars) if cars.is_empty() => {
            bot.send_message(chat_id, "🚗 Гараж пуст. Добавьте машину командой /addcar")
                .await?;
        }
        Ok(cars) => {
            bot.send_message(
                chat_id,
                format!("🚗 Ваш гараж, машин: {}\nВыберите, что поправить", cars.len()),
            )
            .reply_markup(garage_keyboard(&cars))
            .await?;
        }
        Err(e) => {
            log::error!("❌ Garage fetch failed for {}: {}", chat_id, e);
            bot.send_message(chat_id, DB_DOWN_MESSAGE).await?;
        }
    }
    Ok(())
}
