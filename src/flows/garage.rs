use teloxide::types::ChatId;

use crate::bot_state::BotState;
use crate::flows::{
    cancel_keyboard, invitation, photos_keyboard, skip_keyboard, text, CallbackAction, FlowEvent,
    Reply, MAX_PHOTOS,
};
use crate::handlers::utils::{car_card, escape_markdown_v2};
use crate::models::{
    AddCarData, AddCarStep, Car, CarField, CarStatus, ConversationState, FlowState, Member,
    MemberStatus, NewCar,
};
use crate::notify::NotifyCategory;
use crate::storage::StorageError;
use crate::validators;

// ---------------------------------------------------------------------------
// Добавление автомобиля

pub async fn start_add(state: &BotState, chat_id: ChatId) -> Result<Vec<Reply>, StorageError> {
    let member = match state.store.get_member_by_tg_id(chat_id.0).await? {
        Some(m) => m,
        None => {
            return Ok(vec![text("Сначала зарегистрируйтесь — команда /reg")]);
        }
    };
    if matches!(member.status, MemberStatus::Banned | MemberStatus::Left) {
        return Ok(vec![text("Добавление авто недоступно для вашего статуса")]);
    }
    save_add(state, chat_id, AddCarStep::Brand, AddCarData::default()).await;
    log::info!("🚗 Add-car flow started for {}", chat_id);
    Ok(vec![Reply::Keyboard(
        "🚗 Добавляем автомобиль\n\nКакая марка?".to_string(),
        cancel_keyboard(),
    )])
}

async fn save_add(state: &BotState, chat_id: ChatId, step: AddCarStep, data: AddCarData) {
    state
        .sessions
        .set(ConversationState {
            chat_id,
            flow: FlowState::AddCar { step, data },
        })
        .await;
}

fn prompt_add(step: AddCarStep) -> Reply {
    match step {
        AddCarStep::Brand => Reply::Keyboard("Какая марка?".to_string(), cancel_keyboard()),
        AddCarStep::Model => Reply::Keyboard("Модель?".to_string(), cancel_keyboard()),
        AddCarStep::Year => Reply::Keyboard("Год выпуска?".to_string(), cancel_keyboard()),
        AddCarStep::Color => Reply::Keyboard("Цвет?".to_string(), skip_keyboard()),
        AddCarStep::Plate => Reply::Keyboard(
            "Госномер? Латинские буквы и цифры, например A123BC77".to_string(),
            cancel_keyboard(),
        ),
        AddCarStep::Photos => Reply::Keyboard(
            format!("Пришлите до {} фото машины и нажмите «Готово»", MAX_PHOTOS),
            photos_keyboard(false),
        ),
    }
}

pub async fn handle_add(
    state: &BotState,
    chat_id: ChatId,
    step: AddCarStep,
    mut data: AddCarData,
    event: FlowEvent<'_>,
) -> Result<Vec<Reply>, StorageError> {
    match step {
        AddCarStep::Brand => match event {
            FlowEvent::Text(t) if !t.trim().is_empty() => {
                data.brand = Some(t.trim().to_string());
                save_add(state, chat_id, AddCarStep::Model, data).await;
                Ok(vec![prompt_add(AddCarStep::Model)])
            }
            FlowEvent::Action(CallbackAction::Skip) => {
                Ok(vec![text("Марку пропустить нельзя"), prompt_add(AddCarStep::Brand)])
            }
            _ => Ok(vec![text("Напишите марку текстом"), prompt_add(AddCarStep::Brand)]),
        },
        AddCarStep::Model => match event {
            FlowEvent::Text(t) if !t.trim().is_empty() => {
                data.model = Some(t.trim().to_string());
                save_add(state, chat_id, AddCarStep::Year, data).await;
                Ok(vec![prompt_add(AddCarStep::Year)])
            }
            FlowEvent::Action(CallbackAction::Skip) => {
                Ok(vec![text("Модель пропустить нельзя"), prompt_add(AddCarStep::Model)])
            }
            _ => Ok(vec![text("Напишите модель текстом"), prompt_add(AddCarStep::Model)]),
        },
        AddCarStep::Year => match event {
            FlowEvent::Text(t) => match validators::validate_model_year(t) {
                Ok(year) => {
                    data.year = Some(year);
                    save_add(state, chat_id, AddCarStep::Color, data).await;
                    Ok(vec![prompt_add(AddCarStep::Color)])
                }
                Err(e) => Ok(vec![text(e.message()), prompt_add(AddCarStep::Year)]),
            },
            FlowEvent::Action(CallbackAction::Skip) => {
                Ok(vec![text("Год выпуска пропустить нельзя"), prompt_add(AddCarStep::Year)])
            }
            _ => Ok(vec![prompt_add(AddCarStep::Year)]),
        },
        AddCarStep::Color => match event {
            FlowEvent::Text(t) if !t.trim().is_empty() => {
                data.color = Some(t.trim().to_string());
                save_add(state, chat_id, AddCarStep::Plate, data).await;
                Ok(vec![prompt_add(AddCarStep::Plate)])
            }
            FlowEvent::Action(CallbackAction::Skip) => {
                save_add(state, chat_id, AddCarStep::Plate, data).await;
                Ok(vec![prompt_add(AddCarStep::Plate)])
            }
            _ => Ok(vec![prompt_add(AddCarStep::Color)]),
        },
        AddCarStep::Plate => match event {
            FlowEvent::Text(t) => match validators::normalize_plate(t) {
                Ok(plate) => {
                    data.plate = Some(plate);
                    save_add(state, chat_id, AddCarStep::Photos, data).await;
                    Ok(vec![prompt_add(AddCarStep::Photos)])
                }
                Err(e) => Ok(vec![text(e.message()), prompt_add(AddCarStep::Plate)]),
            },
            FlowEvent::Action(CallbackAction::Skip) => {
                Ok(vec![text("Без номера машину не добавить"), prompt_add(AddCarStep::Plate)])
            }
            _ => Ok(vec![prompt_add(AddCarStep::Plate)]),
        },
        AddCarStep::Photos => match event {
            FlowEvent::Photo(file_id) => {
                data.photos.push(file_id.to_string());
                if data.photos.len() >= MAX_PHOTOS {
                    return finish_add(state, chat_id, data).await;
                }
                let count = data.photos.len();
                save_add(state, chat_id, AddCarStep::Photos, data).await;
                Ok(vec![Reply::Keyboard(
                    format!("Фото добавлено ({} из {})", count, MAX_PHOTOS),
                    photos_keyboard(false),
                )])
            }
            FlowEvent::Action(CallbackAction::PhotosDone | CallbackAction::Skip) => {
                finish_add(state, chat_id, data).await
            }
            _ => Ok(vec![
                text("Пришлите фото или нажмите «Готово»"),
                prompt_add(AddCarStep::Photos),
            ]),
        },
    }
}

async fn finish_add(
    state: &BotState,
    chat_id: ChatId,
    data: AddCarData,
) -> Result<Vec<Reply>, StorageError> {
    if !state.sessions.exists(chat_id).await {
        return Ok(vec![]);
    }
    let mut member = match state.store.get_member_by_tg_id(chat_id.0).await? {
        Some(m) => m,
        None => {
            state.sessions.delete(chat_id).await;
            return Ok(vec![text("Профиль не найден, начните с /reg")]);
        }
    };

    let car = state
        .store
        .create_car(NewCar {
            owner_id: Some(member.id),
            brand: data.brand,
            model: data.model,
            year: data.year,
            color: data.color,
            plate: data.plate.unwrap_or_default(),
            photos: data.photos,
            status: CarStatus::Active,
        })
        .await?;

    // первая машина переводит участника из «без авто» в «участник»
    if member.status == MemberStatus::NoVehicle {
        member.status = MemberStatus::Member;
        state.store.update_member(&member).await?;
    }

    // машина появилась в клубе — закрываем висящие приглашения по номеру
    let reconciled = invitation::reconcile_plate(state.store.as_ref(), &car).await?;

    state.sessions.delete(chat_id).await;
    log::info!(
        "✅ Car {} added for {} ({} invitation records closed)",
        car.plate,
        chat_id,
        reconciled
    );

    let mut replies = vec![
        text("🚗 Автомобиль добавлен в ваш гараж"),
        Reply::Md(car_card(&car, Some(&member))),
    ];
    if reconciled > 0 {
        replies.push(text(
            "Кстати, эту машину уже приглашали в клуб — приглашения закрыты как состоявшиеся",
        ));
    }
    if state.notifications.is_enabled(NotifyCategory::Garage) {
        replies.push(Reply::Broadcast(format!(
            "🚗 Новое авто в клубе: {}",
            escape_markdown_v2(&car.short_title())
        )));
    }
    Ok(replies)
}

// ---------------------------------------------------------------------------
// Правка одного поля машины

pub async fn start_edit(
    state: &BotState,
    chat_id: ChatId,
    car_id: i64,
    field: CarField,
) -> Result<Vec<Reply>, StorageError> {
    let Some((_member, car)) = owned_car(state, chat_id, car_id).await? else {
        return Ok(vec![text("Эта машина не найдена в вашем гараже")]);
    };
    state
        .sessions
        .set(ConversationState {
            chat_id,
            flow: FlowState::EditCar {
                car_id: car.id,
                field,
                photos: Vec::new(),
            },
        })
        .await;
    Ok(vec![prompt_edit(&car, field)])
}

fn prompt_edit(car: &Car, field: CarField) -> Reply {
    let title = car.short_title();
    match field {
        CarField::Year => Reply::Keyboard(
            format!("{} — новый год выпуска?", title),
            cancel_keyboard(),
        ),
        CarField::Plate => Reply::Keyboard(
            format!("{} — новый госномер?", title),
            cancel_keyboard(),
        ),
        CarField::Photos => Reply::Keyboard(
            format!(
                "{} — пришлите до {} новых фото, старые будут заменены",
                title, MAX_PHOTOS
            ),
            photos_keyboard(false),
        ),
        other => Reply::Keyboard(
            format!("{} — новое значение поля «{}»?", title, other.title()),
            cancel_keyboard(),
        ),
    }
}

pub async fn handle_edit(
    state: &BotState,
    chat_id: ChatId,
    car_id: i64,
    field: CarField,
    mut photos: Vec<String>,
    event: FlowEvent<'_>,
) -> Result<Vec<Reply>, StorageError> {
    if field == CarField::Photos {
        return match event {
            FlowEvent::Photo(file_id) => {
                photos.push(file_id.to_string());
                if photos.len() >= MAX_PHOTOS {
                    return apply_edit(state, chat_id, car_id, field, None, photos).await;
                }
                let count = photos.len();
                state
                    .sessions
                    .set(ConversationState {
                        chat_id,
                        flow: FlowState::EditCar {
                            car_id,
                            field,
                            photos,
                        },
                    })
                    .await;
                Ok(vec![Reply::Keyboard(
                    format!("Фото добавлено ({} из {})", count, MAX_PHOTOS),
                    photos_keyboard(false),
                )])
            }
            FlowEvent::Action(CallbackAction::PhotosDone) => {
                apply_edit(state, chat_id, car_id, field, None, photos).await
            }
            _ => Ok(vec![text("Пришлите фото или нажмите «Готово»")]),
        };
    }

    match event {
        FlowEvent::Text(t) if !t.trim().is_empty() => {
            apply_edit(state, chat_id, car_id, field, Some(t.trim()), photos).await
        }
        _ => Ok(vec![text("Напишите новое значение текстом")]),
    }
}

async fn apply_edit(
    state: &BotState,
    chat_id: ChatId,
    car_id: i64,
    field: CarField,
    value: Option<&str>,
    photos: Vec<String>,
) -> Result<Vec<Reply>, StorageError> {
    if !state.sessions.exists(chat_id).await {
        return Ok(vec![]);
    }
    let Some((member, mut car)) = owned_car(state, chat_id, car_id).await? else {
        state.sessions.delete(chat_id).await;
        return Ok(vec![text("Эта машина не найдена в вашем гараже")]);
    };

    match field {
        CarField::Brand => car.brand = value.map(|v| v.to_string()),
        CarField::Model => car.model = value.map(|v| v.to_string()),
        CarField::Color => car.color = value.map(|v| v.to_string()),
        CarField::Year => match validators::validate_model_year(value.unwrap_or_default()) {
            Ok(year) => car.year = Some(year),
            Err(e) => return Ok(vec![text(e.message())]),
        },
        CarField::Plate => match validators::normalize_plate(value.unwrap_or_default()) {
            Ok(plate) => car.plate = plate,
            Err(e) => return Ok(vec![text(e.message())]),
        },
        CarField::Photos => car.photos = photos,
    }

    state.store.update_car(&car).await?;
    state.sessions.delete(chat_id).await;
    log::info!("✏️ Car {} updated ({}) by {}", car.id, field.code(), chat_id);
    Ok(vec![
        text("✅ Изменения сохранены"),
        Reply::Md(car_card(&car, Some(&member))),
    ])
}

async fn owned_car(
    state: &BotState,
    chat_id: ChatId,
    car_id: i64,
) -> Result<Option<(Member, Car)>, StorageError> {
    let Some(member) = state.store.get_member_by_tg_id(chat_id.0).await? else {
        return Ok(None);
    };
    let Some(car) = state.store.get_car(car_id).await? else {
        return Ok(None);
    };
    if car.owner_id != Some(member.id) {
        return Ok(None);
    }
    Ok(Some((member, car)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::handle_event;
    use crate::models::{InvitationStatus, NewInvitation, NewMember};
    use crate::storage::memory::MemStorage;
    use crate::storage::Storage;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const CHAT: ChatId = ChatId(200);

    async fn seed_member(store: &MemStorage, status: MemberStatus) -> Member {
        store
            .create_member(NewMember {
                tg_id: CHAT.0,
                username: Some("owner".to_string()),
                first_name: "Пётр".to_string(),
                last_name: "Сидоров".to_string(),
                birth_date: None,
                city: None,
                country: None,
                phone: None,
                about: None,
                photo: None,
                status,
            })
            .await
            .unwrap()
    }

    async fn feed(state: &BotState, event: FlowEvent<'_>) -> Vec<Reply> {
        handle_event(state, CHAT, event).await.expect("no session")
    }

    #[tokio::test]
    async fn add_car_requires_registration() {
        let state = BotState::stub(Arc::new(MemStorage::new()));
        let replies = start_add(&state, CHAT).await.unwrap();
        assert_eq!(replies, vec![text("Сначала зарегистрируйтесь — команда /reg")]);
        assert!(state.sessions.get(CHAT).await.is_none());
    }

    #[tokio::test]
    async fn add_car_walk_upgrades_member_and_stores_car() {
        let store = Arc::new(MemStorage::new());
        seed_member(&store, MemberStatus::NoVehicle).await;
        let state = BotState::stub(Arc::clone(&store));

        start_add(&state, CHAT).await.unwrap();
        feed(&state, FlowEvent::Text("Lada")).await;
        feed(&state, FlowEvent::Text("Niva Travel")).await;

        // невалидный год не двигает шаг
        feed(&state, FlowEvent::Text("3025")).await;
        match state.sessions.get(CHAT).await.unwrap().flow {
            FlowState::AddCar { step, .. } => assert_eq!(step, AddCarStep::Year),
            other => panic!("unexpected flow: {:?}", other),
        }
        feed(&state, FlowEvent::Text("2021")).await;

        feed(&state, FlowEvent::Action(CallbackAction::Skip)).await; // цвет
        feed(&state, FlowEvent::Text(" a123bc77 ")).await;
        feed(&state, FlowEvent::Photo("car_photo_1")).await;
        feed(&state, FlowEvent::Action(CallbackAction::PhotosDone)).await;

        assert!(state.sessions.get(CHAT).await.is_none());
        let cars = store.cars().await;
        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0].plate, "A123BC77");
        assert_eq!(cars[0].status, CarStatus::Active);
        assert_eq!(cars[0].photos, vec!["car_photo_1".to_string()]);

        let member = store.members().await.remove(0);
        assert_eq!(member.status, MemberStatus::Member);
    }

    #[tokio::test]
    async fn adding_owned_car_reconciles_invitations() {
        let store = Arc::new(MemStorage::new());
        seed_member(&store, MemberStatus::NoVehicle).await;
        // машина-приглашение и два приглашения: живое и уже закрытое
        let ghost = store
            .create_car(NewCar {
                owner_id: None,
                brand: None,
                model: None,
                year: None,
                color: None,
                plate: "A123BC77".to_string(),
                photos: vec![],
                status: CarStatus::Invitation,
            })
            .await
            .unwrap();
        store
            .create_invitation(NewInvitation {
                car_id: ghost.id,
                plate: "A123BC77".to_string(),
                created_by: 555,
                comment: None,
                photos: vec![],
                status: InvitationStatus::New,
            })
            .await
            .unwrap();
        let mut closed = store
            .create_invitation(NewInvitation {
                car_id: ghost.id,
                plate: "A123BC77".to_string(),
                created_by: 556,
                comment: None,
                photos: vec![],
                status: InvitationStatus::Deleted,
            })
            .await
            .unwrap();

        let state = BotState::stub(Arc::clone(&store));
        start_add(&state, CHAT).await.unwrap();
        feed(&state, FlowEvent::Text("Lada")).await;
        feed(&state, FlowEvent::Text("Vesta")).await;
        feed(&state, FlowEvent::Text("2020")).await;
        feed(&state, FlowEvent::Action(CallbackAction::Skip)).await;
        feed(&state, FlowEvent::Text("A123BC77")).await;
        feed(&state, FlowEvent::Action(CallbackAction::PhotosDone)).await;

        let cars = store.cars().await;
        let owned = cars.iter().find(|c| c.owner_id.is_some()).unwrap();
        let ghost_after = cars.iter().find(|c| c.id == ghost.id).unwrap();
        assert_eq!(ghost_after.status, CarStatus::InClub);

        let invitations = store.invitations().await;
        let open = invitations.iter().find(|i| i.created_by == 555).unwrap();
        assert_eq!(open.status, InvitationStatus::JoinedClub);
        assert_eq!(open.joined_car_id, Some(owned.id));

        // терминальное приглашение не тронуто
        closed = invitations
            .iter()
            .find(|i| i.id == closed.id)
            .cloned()
            .unwrap();
        assert_eq!(closed.status, InvitationStatus::Deleted);
        assert_eq!(closed.joined_car_id, None);
    }

    #[tokio::test]
    async fn edit_plate_validates_and_saves() {
        let store = Arc::new(MemStorage::new());
        let member = seed_member(&store, MemberStatus::Member).await;
        let car = store
            .create_car(NewCar {
                owner_id: Some(member.id),
                brand: Some("Lada".to_string()),
                model: Some("Vesta".to_string()),
                year: Some(2020),
                color: None,
                plate: "A123BC77".to_string(),
                photos: vec![],
                status: CarStatus::Active,
            })
            .await
            .unwrap();
        let state = BotState::stub(Arc::clone(&store));

        start_edit(&state, CHAT, car.id, CarField::Plate).await.unwrap();

        // мусорный номер: сессия жива, значение прежнее
        feed(&state, FlowEvent::Text("no way")).await;
        assert!(state.sessions.get(CHAT).await.is_some());
        assert_eq!(store.cars().await[0].plate, "A123BC77");

        feed(&state, FlowEvent::Text("x777xx99")).await;
        assert!(state.sessions.get(CHAT).await.is_none());
        assert_eq!(store.cars().await[0].plate, "X777XX99");
    }

    #[tokio::test]
    async fn edit_foreign_car_is_refused() {
        let store = Arc::new(MemStorage::new());
        seed_member(&store, MemberStatus::Member).await;
        let stranger = store
            .create_member(NewMember {
                tg_id: 999,
                username: None,
                first_name: "Кто".to_string(),
                last_name: "То".to_string(),
                birth_date: None,
                city: None,
                country: None,
                phone: None,
                about: None,
                photo: None,
                status: MemberStatus::Member,
            })
            .await
            .unwrap();
        let foreign = store
            .create_car(NewCar {
                owner_id: Some(stranger.id),
                brand: Some("UAZ".to_string()),
                model: Some("Patriot".to_string()),
                year: Some(2019),
                color: None,
                plate: "B555BB55".to_string(),
                photos: vec![],
                status: CarStatus::Active,
            })
            .await
            .unwrap();
        let state = BotState::stub(Arc::clone(&store));

        let replies = start_edit(&state, CHAT, foreign.id, CarField::Brand).await.unwrap();
        assert_eq!(replies, vec![text("Эта машина не найдена в вашем гараже")]);
        assert!(state.sessions.get(CHAT).await.is_none());
    }
}
