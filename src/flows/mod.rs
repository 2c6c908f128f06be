pub mod garage;
pub mod invitation;
pub mod profile;
pub mod registration;
pub mod status;

use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup};

use crate::bot_state::BotState;
use crate::models::{CarField, FlowState, MemberStatus, ProfileField};
use crate::storage::StorageError;

/// Потолок фотографий на один сценарий
pub const MAX_PHOTOS: usize = 5;

pub const STORE_DOWN_MESSAGE: &str =
    "😔 База сейчас недоступна, попробуйте позже. Начатое действие сброшено";

/// Входящее событие, уже очищенное от телеграмной обвязки
#[derive(Debug, Clone)]
pub enum FlowEvent<'a> {
    Text(&'a str),
    /// file_id сохранённого в Telegram фото
    Photo(&'a str),
    Action(CallbackAction),
}

/// Ответы сценария. Сценарий решает «что сказать», отправкой занимается
/// слой handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Обычный текст без разметки
    Text(String),
    /// Текст в MarkdownV2, уже экранированный
    Md(String),
    Keyboard(String, InlineKeyboardMarkup),
    Photo { file_id: String, caption: String },
    /// Рассылка в клубный чат, гейт уже пройден внутри сценария
    Broadcast(String),
}

pub fn text(s: impl Into<String>) -> Reply {
    Reply::Text(s.into())
}

// ---------------------------------------------------------------------------
// Протокол кнопок: вид действия + структурные аргументы, разбор по
// точному совпадению вида. Никаких starts_with с порядком веток.

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackAction {
    Skip,
    Cancel,
    PhotosDone,
    FinishEarly,
    ConfirmDuplicate,
    SetStatusValue(MemberStatus),
    EditProfileField(ProfileField),
    CarMenu(i64),
    EditCarField(i64, CarField),
    Noop,
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Skip => "skip".to_string(),
            CallbackAction::Cancel => "cancel".to_string(),
            CallbackAction::PhotosDone => "photos_done".to_string(),
            CallbackAction::FinishEarly => "finish".to_string(),
            CallbackAction::ConfirmDuplicate => "dup_ok".to_string(),
            CallbackAction::SetStatusValue(s) => format!("status:{}", s.as_str()),
            CallbackAction::EditProfileField(f) => format!("edit_member:{}", f.code()),
            CallbackAction::CarMenu(id) => format!("car_menu:{}", id),
            CallbackAction::EditCarField(id, f) => format!("edit_car:{}:{}", f.code(), id),
            CallbackAction::Noop => "noop".to_string(),
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        let mut parts = token.split(':');
        let kind = parts.next()?;
        match kind {
            "skip" => Some(CallbackAction::Skip),
            "cancel" => Some(CallbackAction::Cancel),
            "photos_done" => Some(CallbackAction::PhotosDone),
            "finish" => Some(CallbackAction::FinishEarly),
            "dup_ok" => Some(CallbackAction::ConfirmDuplicate),
            "noop" => Some(CallbackAction::Noop),
            "status" => MemberStatus::parse(parts.next()?).map(CallbackAction::SetStatusValue),
            "edit_member" => ProfileField::parse(parts.next()?).map(CallbackAction::EditProfileField),
            "car_menu" => parts.next()?.parse().ok().map(CallbackAction::CarMenu),
            "edit_car" => {
                let field = CarField::parse(parts.next()?)?;
                let id: i64 = parts.next()?.parse().ok()?;
                Some(CallbackAction::EditCarField(id, field))
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Клавиатуры шагов

pub fn cancel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "❌ Отмена",
        CallbackAction::Cancel.encode(),
    )]])
}

pub fn skip_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("⏭ Пропустить", CallbackAction::Skip.encode()),
        InlineKeyboardButton::callback("❌ Отмена", CallbackAction::Cancel.encode()),
    ]])
}

/// Клавиатура шага сбора фото; finish добавляет досрочное завершение
pub fn photos_keyboard(finish: bool) -> InlineKeyboardMarkup {
    let mut row = vec![InlineKeyboardButton::callback(
        "✅ Готово",
        CallbackAction::PhotosDone.encode(),
    )];
    if finish {
        row.push(InlineKeyboardButton::callback(
            "🏁 Завершить",
            CallbackAction::FinishEarly.encode(),
        ));
    }
    row.push(InlineKeyboardButton::callback(
        "❌ Отмена",
        CallbackAction::Cancel.encode(),
    ));
    InlineKeyboardMarkup::new(vec![row])
}

pub fn duplicate_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("➡️ Всё равно создать", CallbackAction::ConfirmDuplicate.encode()),
        InlineKeyboardButton::callback("❌ Отмена", CallbackAction::Cancel.encode()),
    ]])
}

// ---------------------------------------------------------------------------
// Диспетчер

/// Скармливает событие активному диалогу. None — диалога нет, событие
/// не про нас. Отмена обрабатывается здесь одинаково для всех сценариев.
pub async fn handle_event(
    state: &BotState,
    chat_id: ChatId,
    event: FlowEvent<'_>,
) -> Option<Vec<Reply>> {
    let session = state.sessions.get(chat_id).await?;

    if let FlowEvent::Action(CallbackAction::Cancel) = event {
        let title = session.flow.title();
        state.sessions.delete(chat_id).await;
        log::info!("Flow cancelled for {}: {}", chat_id, title);
        return Some(vec![text(format!("❌ {} — отменено", title))]);
    }

    let result = match session.flow {
        FlowState::Registration { step, data } => {
            registration::handle(state, chat_id, step, data, event).await
        }
        FlowState::AddCar { step, data } => garage::handle_add(state, chat_id, step, data, event).await,
        FlowState::Invite { step, data } => {
            invitation::handle(state, chat_id, step, data, event).await
        }
        FlowState::EditProfile { field } => profile::handle(state, chat_id, field, event).await,
        FlowState::EditCar {
            car_id,
            field,
            photos,
        } => garage::handle_edit(state, chat_id, car_id, field, photos, event).await,
        FlowState::SetStatus { step } => status::handle_set_status(state, chat_id, step, event).await,
        FlowState::SetPassword => status::handle_set_password(state, chat_id, event).await,
        FlowState::Activate => status::handle_activate(state, chat_id, event).await,
        FlowState::Search => status::handle_search(state, chat_id, event).await,
    };

    Some(recover(state, chat_id, result).await)
}

/// Единая развязка отказа хранилища: диалог удаляется, пользователю —
/// просьба повторить позже. Никаких частичных повторов внутри сессии.
pub async fn recover(
    state: &BotState,
    chat_id: ChatId,
    result: Result<Vec<Reply>, StorageError>,
) -> Vec<Reply> {
    match result {
        Ok(replies) => replies,
        Err(e) => {
            log::error!("❌ Storage failure in flow for {}: {}", chat_id, e);
            state.sessions.delete(chat_id).await;
            vec![text(STORE_DOWN_MESSAGE)]
        }
    }
}
