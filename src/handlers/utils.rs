use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton, KeyboardMarkup,
    ParseMode, ReplyMarkup,
};

use crate::bot_state::BotState;
use crate::flows::{CallbackAction, Reply};
use crate::models::{Car, CarField, Invitation, Member, ProfileField};

/// Экранирование MarkdownV2
pub fn escape_markdown_v2(text: &str) -> String {
    let specials = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut out = String::with_capacity(text.len() * 2);

    for ch in text.chars() {
        if specials.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Главное меню
pub fn main_menu_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(
        KeyboardMarkup::new(vec![
            vec![
                KeyboardButton::new("👤 Профиль"),
                KeyboardButton::new("🚗 Мой гараж"),
            ],
            vec![
                KeyboardButton::new("🔍 Поиск"),
                KeyboardButton::new("ℹ️ Помощь"),
            ],
        ])
        .resize_keyboard(),
    )
}

// ---------------------------------------------------------------------------
// Карточки. Текст в MarkdownV2, всё динамическое экранируется.

pub fn member_card(member: &Member) -> String {
    let mut card = format!("👤 *{}*\n", escape_markdown_v2(&member.full_name()));
    card += &format!("*Статус:* {}\n", escape_markdown_v2(member.status.title()));
    if let Some(username) = &member.username {
        card += &format!("*Телеграм:* @{}\n", escape_markdown_v2(username));
    }
    if let Some(birth_date) = member.birth_date {
        card += &format!(
            "*Дата рождения:* {}\n",
            escape_markdown_v2(&birth_date.format("%d.%m.%Y").to_string())
        );
    }
    if let Some(city) = &member.city {
        card += &format!("*Город:* {}\n", escape_markdown_v2(city));
    }
    if let Some(country) = &member.country {
        card += &format!("*Страна:* {}\n", escape_markdown_v2(country));
    }
    if let Some(phone) = &member.phone {
        card += &format!("*Телефон:* {}\n", escape_markdown_v2(phone));
    }
    if let Some(about) = &member.about {
        card += &format!("*О себе:* {}\n", escape_markdown_v2(about));
    }
    card
}

pub fn car_card(car: &Car, owner: Option<&Member>) -> String {
    let mut card = format!("🚗 *{}*\n", escape_markdown_v2(&car.short_title()));
    card += &format!("*Статус:* {}\n", escape_markdown_v2(car.status.title()));
    if let Some(year) = car.year {
        card += &format!("*Год выпуска:* {}\n", year);
    }
    if let Some(color) = &car.color {
        card += &format!("*Цвет:* {}\n", escape_markdown_v2(color));
    }
    if let Some(owner) = owner {
        card += &format!("*Владелец:* {}\n", escape_markdown_v2(&owner.full_name()));
    }
    card
}

/// Строка истории приглашений, без разметки
pub fn invitation_line(invitation: &Invitation) -> String {
    format!(
        "• {} — {}",
        invitation.created_at.format("%d.%m.%Y"),
        invitation.status.title()
    )
}

// ---------------------------------------------------------------------------
// Клавиатуры разделов

pub fn profile_edit_keyboard() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for pair in ProfileField::all().chunks(2) {
        rows.push(
            pair.iter()
                .map(|f| {
                    InlineKeyboardButton::callback(
                        format!("✏️ {}", f.title()),
                        CallbackAction::EditProfileField(*f).encode(),
                    )
                })
                .collect(),
        );
    }
    InlineKeyboardMarkup::new(rows)
}

pub fn garage_keyboard(cars: &[Car]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = cars
        .iter()
        .map(|car| {
            vec![InlineKeyboardButton::callback(
                format!("✏️ {}", car.short_title()),
                CallbackAction::CarMenu(car.id).encode(),
            )]
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

pub fn car_fields_keyboard(car_id: i64) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for pair in CarField::all().chunks(2) {
        rows.push(
            pair.iter()
                .map(|f| {
                    InlineKeyboardButton::callback(
                        f.title(),
                        CallbackAction::EditCarField(car_id, *f).encode(),
                    )
                })
                .collect(),
        );
    }
    InlineKeyboardMarkup::new(rows)
}

// ---------------------------------------------------------------------------
// Отправка ответов сценария

pub async fn send_replies(
    bot: &Bot,
    state: &BotState,
    chat_id: ChatId,
    replies: Vec<Reply>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    for reply in replies {
        match reply {
            Reply::Text(text) => {
                bot.send_message(chat_id, text).await?;
            }
            Reply::Md(text) => {
                bot.send_message(chat_id, text)
                    .parse_mode(ParseMode::MarkdownV2)
                    .await?;
            }
            Reply::Keyboard(text, keyboard) => {
                bot.send_message(chat_id, text).reply_markup(keyboard).await?;
            }
            Reply::Photo { file_id, caption } => {
                let sent = bot
                    .send_photo(chat_id, InputFile::file_id(file_id))
                    .caption(caption.clone())
                    .parse_mode(ParseMode::MarkdownV2)
                    .await;
                if let Err(e) = sent {
                    // фото не ушло — показываем хотя бы текст
                    log::warn!("📷 Photo send failed for {}: {}", chat_id, e);
                    bot.send_message(chat_id, caption)
                        .parse_mode(ParseMode::MarkdownV2)
                        .await?;
                }
            }
            Reply::Broadcast(text) => {
                let Some(club_chat) = state.notifications.club_chat else {
                    continue;
                };
                // рассылка не важнее основного ответа: ошибку только пишем в лог
                if let Err(e) = bot
                    .send_message(club_chat, text)
                    .parse_mode(ParseMode::MarkdownV2)
                    .await
                {
                    log::warn!("📣 Broadcast to {} failed: {}", club_chat, e);
                }
            }
        }
    }
    Ok(())
}
