use teloxide::types::ChatId;

use crate::bot_state::BotState;
use crate::flows::{cancel_keyboard, text, FlowEvent, Reply};
use crate::handlers::utils::member_card;
use crate::models::{ConversationState, FlowState, ProfileField};
use crate::storage::StorageError;
use crate::validators;

/// Правка одного поля профиля: кнопка выбирает поле, дальше один ответ
pub async fn start_edit(
    state: &BotState,
    chat_id: ChatId,
    field: ProfileField,
) -> Result<Vec<Reply>, StorageError> {
    if state.store.get_member_by_tg_id(chat_id.0).await?.is_none() {
        return Ok(vec![text("Профиль не найден, начните с /reg")]);
    }
    state
        .sessions
        .set(ConversationState {
            chat_id,
            flow: FlowState::EditProfile { field },
        })
        .await;
    let prompt = match field {
        ProfileField::BirthDate => "Новая дата рождения в формате ДД.ММ.ГГГГ".to_string(),
        ProfileField::Photo => "Пришлите новое фото профиля".to_string(),
        other => format!("Новое значение поля «{}»?", other.title()),
    };
    Ok(vec![Reply::Keyboard(prompt, cancel_keyboard())])
}

pub async fn handle(
    state: &BotState,
    chat_id: ChatId,
    field: ProfileField,
    event: FlowEvent<'_>,
) -> Result<Vec<Reply>, StorageError> {
    if field == ProfileField::Photo {
        return match event {
            FlowEvent::Photo(file_id) => apply(state, chat_id, field, file_id).await,
            _ => Ok(vec![text("Пришлите фото, не текст")]),
        };
    }

    match event {
        FlowEvent::Text(t) if !t.trim().is_empty() => apply(state, chat_id, field, t.trim()).await,
        _ => Ok(vec![text("Напишите новое значение текстом")]),
    }
}

async fn apply(
    state: &BotState,
    chat_id: ChatId,
    field: ProfileField,
    value: &str,
) -> Result<Vec<Reply>, StorageError> {
    if !state.sessions.exists(chat_id).await {
        return Ok(vec![]);
    }
    let Some(mut member) = state.store.get_member_by_tg_id(chat_id.0).await? else {
        state.sessions.delete(chat_id).await;
        return Ok(vec![text("Профиль не найден, начните с /reg")]);
    };

    match field {
        ProfileField::FirstName => member.first_name = value.to_string(),
        ProfileField::LastName => member.last_name = value.to_string(),
        ProfileField::BirthDate => match validators::parse_birth_date(value) {
            Ok(date) => member.birth_date = Some(date),
            Err(e) => return Ok(vec![text(e.message())]),
        },
        ProfileField::City => member.city = Some(value.to_string()),
        ProfileField::Country => member.country = Some(value.to_string()),
        ProfileField::Phone => member.phone = Some(value.to_string()),
        ProfileField::About => member.about = Some(value.to_string()),
        ProfileField::Photo => member.photo = Some(value.to_string()),
    }

    state.store.update_member(&member).await?;
    state.sessions.delete(chat_id).await;
    log::info!("✏️ Profile field {} updated for {}", field.code(), chat_id);
    Ok(vec![text("✅ Профиль обновлён"), Reply::Md(member_card(&member))])
}
