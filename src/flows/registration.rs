use teloxide::types::ChatId;

use crate::bot_state::BotState;
use crate::flows::{cancel_keyboard, skip_keyboard, text, CallbackAction, FlowEvent, Reply};
use crate::handlers::utils::{escape_markdown_v2, member_card};
use crate::models::{ConversationState, FlowState, MemberStatus, NewMember, RegData, RegStep};
use crate::notify::NotifyCategory;
use crate::storage::StorageError;
use crate::validators;

const DEFAULT_COUNTRY: &str = "Россия";

pub async fn start(
    state: &BotState,
    chat_id: ChatId,
    username: Option<&str>,
) -> Result<Vec<Reply>, StorageError> {
    if state.store.get_member_by_tg_id(chat_id.0).await?.is_some() {
        return Ok(vec![text(
            "Вы уже зарегистрированы. Профиль — команда /profile",
        )]);
    }
    let data = RegData {
        username: username.map(|u| u.to_string()),
        ..Default::default()
    };
    save(state, chat_id, RegStep::Name, data).await;
    log::info!("📝 Registration started for {}", chat_id);
    Ok(vec![Reply::Keyboard(
        "📝 Регистрация в клубе\n\nКак вас зовут? Напишите имя".to_string(),
        cancel_keyboard(),
    )])
}

async fn save(state: &BotState, chat_id: ChatId, step: RegStep, data: RegData) {
    state
        .sessions
        .set(ConversationState {
            chat_id,
            flow: FlowState::Registration { step, data },
        })
        .await;
}

fn prompt(step: RegStep) -> Reply {
    match step {
        RegStep::Name => Reply::Keyboard("Как вас зовут? Напишите имя".to_string(), cancel_keyboard()),
        RegStep::LastName => Reply::Keyboard("Ваша фамилия?".to_string(), cancel_keyboard()),
        RegStep::BirthDate => Reply::Keyboard(
            "Дата рождения в формате ДД.ММ.ГГГГ".to_string(),
            cancel_keyboard(),
        ),
        RegStep::City => Reply::Keyboard("Из какого вы города?".to_string(), skip_keyboard()),
        RegStep::Country => Reply::Keyboard(
            format!("Страна? По умолчанию — {}", DEFAULT_COUNTRY),
            skip_keyboard(),
        ),
        RegStep::Phone => Reply::Keyboard("Телефон для связи?".to_string(), skip_keyboard()),
        RegStep::About => Reply::Keyboard("Пара слов о себе?".to_string(), skip_keyboard()),
        RegStep::Photo => Reply::Keyboard(
            "Пришлите ваше фото, оно попадёт в профиль".to_string(),
            skip_keyboard(),
        ),
    }
}

pub async fn handle(
    state: &BotState,
    chat_id: ChatId,
    step: RegStep,
    mut data: RegData,
    event: FlowEvent<'_>,
) -> Result<Vec<Reply>, StorageError> {
    match step {
        RegStep::Name => match event {
            FlowEvent::Text(t) if !t.trim().is_empty() => {
                data.first_name = Some(t.trim().to_string());
                save(state, chat_id, RegStep::LastName, data).await;
                Ok(vec![prompt(RegStep::LastName)])
            }
            FlowEvent::Action(CallbackAction::Skip) => Ok(vec![
                text("Имя пропустить нельзя"),
                prompt(RegStep::Name),
            ]),
            _ => Ok(vec![text("Напишите имя текстом"), prompt(RegStep::Name)]),
        },
        RegStep::LastName => match event {
            FlowEvent::Text(t) if !t.trim().is_empty() => {
                data.last_name = Some(t.trim().to_string());
                save(state, chat_id, RegStep::BirthDate, data).await;
                Ok(vec![prompt(RegStep::BirthDate)])
            }
            FlowEvent::Action(CallbackAction::Skip) => Ok(vec![
                text("Фамилию пропустить нельзя"),
                prompt(RegStep::LastName),
            ]),
            _ => Ok(vec![text("Напишите фамилию текстом"), prompt(RegStep::LastName)]),
        },
        RegStep::BirthDate => match event {
            FlowEvent::Text(t) => match validators::parse_birth_date(t) {
                Ok(date) => {
                    data.birth_date = Some(date);
                    save(state, chat_id, RegStep::City, data).await;
                    Ok(vec![prompt(RegStep::City)])
                }
                Err(e) => Ok(vec![text(e.message()), prompt(RegStep::BirthDate)]),
            },
            FlowEvent::Action(CallbackAction::Skip) => Ok(vec![
                text("Дату рождения пропустить нельзя"),
                prompt(RegStep::BirthDate),
            ]),
            _ => Ok(vec![prompt(RegStep::BirthDate)]),
        },
        RegStep::City => match event {
            FlowEvent::Text(t) if !t.trim().is_empty() => {
                data.city = Some(t.trim().to_string());
                save(state, chat_id, RegStep::Country, data).await;
                Ok(vec![prompt(RegStep::Country)])
            }
            FlowEvent::Action(CallbackAction::Skip) => {
                save(state, chat_id, RegStep::Country, data).await;
                Ok(vec![prompt(RegStep::Country)])
            }
            _ => Ok(vec![text("Напишите город текстом или пропустите"), prompt(RegStep::City)]),
        },
        RegStep::Country => match event {
            FlowEvent::Text(t) if !t.trim().is_empty() => {
                data.country = Some(t.trim().to_string());
                save(state, chat_id, RegStep::Phone, data).await;
                Ok(vec![prompt(RegStep::Phone)])
            }
            FlowEvent::Action(CallbackAction::Skip) => {
                // пропущенная страна получает фиксированное значение
                data.country = Some(DEFAULT_COUNTRY.to_string());
                save(state, chat_id, RegStep::Phone, data).await;
                Ok(vec![prompt(RegStep::Phone)])
            }
            _ => Ok(vec![prompt(RegStep::Country)]),
        },
        RegStep::Phone => match event {
            FlowEvent::Text(t) if !t.trim().is_empty() => {
                data.phone = Some(t.trim().to_string());
                save(state, chat_id, RegStep::About, data).await;
                Ok(vec![prompt(RegStep::About)])
            }
            FlowEvent::Action(CallbackAction::Skip) => {
                save(state, chat_id, RegStep::About, data).await;
                Ok(vec![prompt(RegStep::About)])
            }
            _ => Ok(vec![prompt(RegStep::Phone)]),
        },
        RegStep::About => match event {
            FlowEvent::Text(t) if !t.trim().is_empty() => {
                data.about = Some(t.trim().to_string());
                save(state, chat_id, RegStep::Photo, data).await;
                Ok(vec![prompt(RegStep::Photo)])
            }
            FlowEvent::Action(CallbackAction::Skip) => {
                save(state, chat_id, RegStep::Photo, data).await;
                Ok(vec![prompt(RegStep::Photo)])
            }
            _ => Ok(vec![prompt(RegStep::About)]),
        },
        RegStep::Photo => match event {
            FlowEvent::Photo(file_id) => {
                data.photo = Some(file_id.to_string());
                finish(state, chat_id, data).await
            }
            FlowEvent::Action(CallbackAction::Skip | CallbackAction::PhotosDone) => {
                finish(state, chat_id, data).await
            }
            _ => Ok(vec![
                text("Пришлите фото или нажмите «Пропустить»"),
                prompt(RegStep::Photo),
            ]),
        },
    }
}

/// Единственная запись в хранилище, затем удаление диалога, затем
/// уведомления. Отмена, пришедшая раньше, побеждает: без живой сессии
/// ничего не фиксируем.
async fn finish(
    state: &BotState,
    chat_id: ChatId,
    data: RegData,
) -> Result<Vec<Reply>, StorageError> {
    if !state.sessions.exists(chat_id).await {
        return Ok(vec![]);
    }

    let member = state
        .store
        .create_member(NewMember {
            tg_id: chat_id.0,
            username: data.username,
            first_name: data.first_name.unwrap_or_default(),
            last_name: data.last_name.unwrap_or_default(),
            birth_date: data.birth_date,
            city: data.city,
            country: data.country,
            phone: data.phone,
            about: data.about,
            photo: data.photo,
            status: MemberStatus::NoVehicle,
        })
        .await?;

    state.sessions.delete(chat_id).await;
    log::info!("✅ Member registered: {} ({})", member.full_name(), chat_id);

    let mut replies = vec![
        text("🎉 Добро пожаловать в клуб! Добавьте автомобиль командой /addcar"),
        Reply::Md(member_card(&member)),
    ];
    if state.notifications.is_enabled(NotifyCategory::Registration) {
        replies.push(Reply::Broadcast(format!(
            "🎉 В клубе новый участник: {}",
            escape_markdown_v2(&member.full_name())
        )));
    }
    Ok(replies)
}
