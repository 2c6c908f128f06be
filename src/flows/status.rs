use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup};

use crate::bot_state::BotState;
use crate::flows::{cancel_keyboard, text, CallbackAction, FlowEvent, Reply};
use crate::handlers::utils::{car_card, member_card};
use crate::models::{ConversationState, FlowState, Member, MemberStatus, SetStatusStep};
use crate::password;
use crate::storage::StorageError;
use crate::validators;

// ---------------------------------------------------------------------------
// Админская смена статуса участника

pub async fn start_set_status(state: &BotState, chat_id: ChatId) -> Vec<Reply> {
    state
        .sessions
        .set(ConversationState {
            chat_id,
            flow: FlowState::SetStatus {
                step: SetStatusStep::PickMember,
            },
        })
        .await;
    vec![Reply::Keyboard(
        "Кому меняем статус? Пришлите телеграм-id или @username".to_string(),
        cancel_keyboard(),
    )]
}

fn status_keyboard() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = MemberStatus::all()
        .iter()
        .map(|s| {
            vec![InlineKeyboardButton::callback(
                s.title(),
                CallbackAction::SetStatusValue(*s).encode(),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        "❌ Отмена",
        CallbackAction::Cancel.encode(),
    )]);
    InlineKeyboardMarkup::new(rows)
}

pub async fn handle_set_status(
    state: &BotState,
    chat_id: ChatId,
    step: SetStatusStep,
    event: FlowEvent<'_>,
) -> Result<Vec<Reply>, StorageError> {
    match step {
        SetStatusStep::PickMember => match event {
            FlowEvent::Text(t) => {
                let member = lookup_member(state, t.trim()).await?;
                match member {
                    Some(m) => {
                        state
                            .sessions
                            .set(ConversationState {
                                chat_id,
                                flow: FlowState::SetStatus {
                                    step: SetStatusStep::PickStatus { tg_id: m.tg_id },
                                },
                            })
                            .await;
                        Ok(vec![
                            Reply::Md(member_card(&m)),
                            Reply::Keyboard("Новый статус?".to_string(), status_keyboard()),
                        ])
                    }
                    None => Ok(vec![Reply::Keyboard(
                        "Участник не найден. Телеграм-id или @username?".to_string(),
                        cancel_keyboard(),
                    )]),
                }
            }
            _ => Ok(vec![Reply::Keyboard(
                "Пришлите телеграм-id или @username текстом".to_string(),
                cancel_keyboard(),
            )]),
        },
        SetStatusStep::PickStatus { tg_id } => match event {
            FlowEvent::Action(CallbackAction::SetStatusValue(new_status)) => {
                if !state.sessions.exists(chat_id).await {
                    return Ok(vec![]);
                }
                let Some(mut member) = state.store.get_member_by_tg_id(tg_id).await? else {
                    state.sessions.delete(chat_id).await;
                    return Ok(vec![text("Участник уже не найден")]);
                };
                let old = member.status;
                member.status = new_status;
                state.store.update_member(&member).await?;
                state.sessions.delete(chat_id).await;
                log::info!(
                    "🛠 Status of {} changed by admin {}: {} -> {}",
                    member.tg_id,
                    chat_id,
                    old.as_str(),
                    new_status.as_str()
                );
                Ok(vec![text(format!(
                    "✅ {}: {} → {}",
                    member.full_name(),
                    old.title(),
                    new_status.title()
                ))])
            }
            _ => Ok(vec![Reply::Keyboard(
                "Выберите статус кнопкой".to_string(),
                status_keyboard(),
            )]),
        },
    }
}

async fn lookup_member(state: &BotState, query: &str) -> Result<Option<Member>, StorageError> {
    if let Some(username) = query.strip_prefix('@') {
        return state.store.get_member_by_username(username).await;
    }
    match query.parse::<i64>() {
        Ok(tg_id) => state.store.get_member_by_tg_id(tg_id).await,
        Err(_) => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Пароль активации: установка админом и самостоятельная активация

pub async fn start_set_password(state: &BotState, chat_id: ChatId) -> Vec<Reply> {
    state
        .sessions
        .set(ConversationState {
            chat_id,
            flow: FlowState::SetPassword,
        })
        .await;
    vec![Reply::Keyboard(
        format!(
            "Новый пароль активации? Минимум {} символов, живёт 10 минут",
            password::MIN_LEN
        ),
        cancel_keyboard(),
    )]
}

pub async fn handle_set_password(
    state: &BotState,
    chat_id: ChatId,
    event: FlowEvent<'_>,
) -> Result<Vec<Reply>, StorageError> {
    match event {
        FlowEvent::Text(t) => {
            if state.password.set(t.trim()).await {
                state.sessions.delete(chat_id).await;
                log::info!("🔑 Activation password set by admin {}", chat_id);
                Ok(vec![text(
                    "🔑 Пароль установлен и действует 10 минут. Раздайте его на встрече",
                )])
            } else {
                Ok(vec![Reply::Keyboard(
                    format!("Слишком короткий, нужно от {} символов", password::MIN_LEN),
                    cancel_keyboard(),
                )])
            }
        }
        _ => Ok(vec![Reply::Keyboard(
            "Пришлите пароль текстом".to_string(),
            cancel_keyboard(),
        )]),
    }
}

/// Самостоятельный апгрейд до «актива» по временному паролю. Доступен
/// только участникам в статусах «участник» и «без авто».
pub async fn start_activate(state: &BotState, chat_id: ChatId) -> Result<Vec<Reply>, StorageError> {
    let Some(member) = state.store.get_member_by_tg_id(chat_id.0).await? else {
        return Ok(vec![text("Сначала зарегистрируйтесь — команда /reg")]);
    };
    match member.status {
        MemberStatus::Active => return Ok(vec![text("Вы уже актив клуба 🏁")]),
        MemberStatus::Member | MemberStatus::NoVehicle => {}
        _ => return Ok(vec![text("Активация недоступна для вашего статуса")]),
    }
    if !state.password.is_active().await {
        return Ok(vec![text(
            "Сейчас активация закрыта: пароль не объявлен или истёк",
        )]);
    }
    state
        .sessions
        .set(ConversationState {
            chat_id,
            flow: FlowState::Activate,
        })
        .await;
    Ok(vec![Reply::Keyboard(
        "Введите пароль активации с встречи".to_string(),
        cancel_keyboard(),
    )])
}

pub async fn handle_activate(
    state: &BotState,
    chat_id: ChatId,
    event: FlowEvent<'_>,
) -> Result<Vec<Reply>, StorageError> {
    match event {
        FlowEvent::Text(t) => {
            // неверный ввод не гасит ни пароль, ни сессию
            if !state.password.verify(t.trim()).await {
                return Ok(vec![Reply::Keyboard(
                    "Пароль не подошёл, попробуйте ещё раз".to_string(),
                    cancel_keyboard(),
                )]);
            }
            if !state.sessions.exists(chat_id).await {
                return Ok(vec![]);
            }
            let Some(mut member) = state.store.get_member_by_tg_id(chat_id.0).await? else {
                state.sessions.delete(chat_id).await;
                return Ok(vec![text("Профиль не найден, начните с /reg")]);
            };
            member.status = MemberStatus::Active;
            state.store.update_member(&member).await?;
            state.sessions.delete(chat_id).await;
            log::info!("🏁 Member {} upgraded to active", chat_id);
            Ok(vec![text("🏁 Готово, теперь вы актив клуба!")])
        }
        _ => Ok(vec![Reply::Keyboard(
            "Пришлите пароль текстом".to_string(),
            cancel_keyboard(),
        )]),
    }
}

// ---------------------------------------------------------------------------
// Поиск машины по номеру

pub async fn start_search(state: &BotState, chat_id: ChatId) -> Vec<Reply> {
    state
        .sessions
        .set(ConversationState {
            chat_id,
            flow: FlowState::Search,
        })
        .await;
    vec![Reply::Keyboard(
        "🔍 Какой номер ищем? Латинские буквы и цифры".to_string(),
        cancel_keyboard(),
    )]
}

pub async fn handle_search(
    state: &BotState,
    chat_id: ChatId,
    event: FlowEvent<'_>,
) -> Result<Vec<Reply>, StorageError> {
    match event {
        FlowEvent::Text(t) => match validators::normalize_plate(t) {
            Ok(plate) => {
                let cars = state.store.get_cars_by_plate(&plate).await?;
                state.sessions.delete(chat_id).await;
                if cars.is_empty() {
                    return Ok(vec![text(format!("По номеру {} ничего не нашлось", plate))]);
                }
                let mut replies = vec![text(format!("Найдено записей: {}", cars.len()))];
                for car in &cars {
                    replies.push(Reply::Md(car_card(car, None)));
                }
                Ok(replies)
            }
            Err(e) => Ok(vec![
                text(e.message()),
                Reply::Keyboard("Какой номер ищем?".to_string(), cancel_keyboard()),
            ]),
        },
        _ => Ok(vec![Reply::Keyboard(
            "Напишите номер текстом".to_string(),
            cancel_keyboard(),
        )]),
    }
}
