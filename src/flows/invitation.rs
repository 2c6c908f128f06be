use teloxide::types::ChatId;

use crate::bot_state::BotState;
use crate::flows::{
    cancel_keyboard, duplicate_keyboard, photos_keyboard, skip_keyboard, text, CallbackAction,
    FlowEvent, Reply, MAX_PHOTOS,
};
use crate::handlers::utils::{car_card, escape_markdown_v2, invitation_line};
use crate::models::{
    Car, CarStatus, ConversationState, FlowState, InvitationStatus, InviteData, InviteStep,
    MemberStatus, NewCar, NewInvitation,
};
use crate::notify::NotifyCategory;
use crate::storage::{Storage, StorageError};
use crate::validators;

/// Приглашение: увидел интересную машину — оставь её номер, фото и
/// комментарий, клуб найдёт владельца.
pub async fn start(
    state: &BotState,
    chat_id: ChatId,
    broadcast: bool,
) -> Result<Vec<Reply>, StorageError> {
    let member = match state.store.get_member_by_tg_id(chat_id.0).await? {
        Some(m) => m,
        None => {
            return Ok(vec![text("Приглашения доступны участникам клуба, начните с /reg")]);
        }
    };
    if matches!(member.status, MemberStatus::Banned | MemberStatus::Left) {
        return Ok(vec![text("Приглашения недоступны для вашего статуса")]);
    }
    let data = InviteData {
        broadcast,
        ..Default::default()
    };
    save(state, chat_id, InviteStep::Plate, data).await;
    log::info!("📨 Invite flow started for {}", chat_id);
    Ok(vec![Reply::Keyboard(
        "📨 Новое приглашение\n\nГосномер машины? Латинские буквы и цифры".to_string(),
        cancel_keyboard(),
    )])
}

async fn save(state: &BotState, chat_id: ChatId, step: InviteStep, data: InviteData) {
    state
        .sessions
        .set(ConversationState {
            chat_id,
            flow: FlowState::Invite { step, data },
        })
        .await;
}

fn photos_prompt() -> Reply {
    Reply::Keyboard(
        format!(
            "Пришлите до {} фото машины. «Готово» — дальше, «Завершить» — сразу создать",
            MAX_PHOTOS
        ),
        photos_keyboard(true),
    )
}

fn comment_prompt() -> Reply {
    Reply::Keyboard(
        "Комментарий? Где видели машину, что запомнилось".to_string(),
        skip_keyboard(),
    )
}

pub async fn handle(
    state: &BotState,
    chat_id: ChatId,
    step: InviteStep,
    mut data: InviteData,
    event: FlowEvent<'_>,
) -> Result<Vec<Reply>, StorageError> {
    match step {
        InviteStep::Plate => match event {
            FlowEvent::Text(t) => match validators::normalize_plate(t) {
                Ok(plate) => resolve_plate(state, chat_id, data, plate).await,
                Err(e) => Ok(vec![
                    text(e.message()),
                    Reply::Keyboard("Госномер?".to_string(), cancel_keyboard()),
                ]),
            },
            // номер обязателен всегда
            FlowEvent::Action(CallbackAction::Skip) => Ok(vec![
                text("Без номера приглашение не создать"),
                Reply::Keyboard("Госномер?".to_string(), cancel_keyboard()),
            ]),
            _ => Ok(vec![Reply::Keyboard(
                "Напишите госномер текстом".to_string(),
                cancel_keyboard(),
            )]),
        },
        InviteStep::ConfirmDuplicate => match event {
            FlowEvent::Action(CallbackAction::ConfirmDuplicate) => {
                data.duplicate_confirmed = true;
                save(state, chat_id, InviteStep::Photos, data).await;
                Ok(vec![photos_prompt()])
            }
            _ => Ok(vec![Reply::Keyboard(
                "Эту машину уже приглашали. Создать повторное приглашение?".to_string(),
                duplicate_keyboard(),
            )]),
        },
        InviteStep::Photos => match event {
            FlowEvent::Photo(file_id) => {
                data.photos.push(file_id.to_string());
                if data.photos.len() >= MAX_PHOTOS {
                    save(state, chat_id, InviteStep::Comment, data).await;
                    return Ok(vec![comment_prompt()]);
                }
                let count = data.photos.len();
                save(state, chat_id, InviteStep::Photos, data).await;
                Ok(vec![Reply::Keyboard(
                    format!("Фото добавлено ({} из {})", count, MAX_PHOTOS),
                    photos_keyboard(true),
                )])
            }
            FlowEvent::Action(CallbackAction::PhotosDone) => {
                save(state, chat_id, InviteStep::Comment, data).await;
                Ok(vec![comment_prompt()])
            }
            FlowEvent::Action(CallbackAction::FinishEarly) => finish(state, chat_id, data).await,
            _ => Ok(vec![photos_prompt()]),
        },
        InviteStep::Comment => match event {
            FlowEvent::Text(t) if !t.trim().is_empty() => {
                data.comment = Some(t.trim().to_string());
                finish(state, chat_id, data).await
            }
            FlowEvent::Action(CallbackAction::Skip | CallbackAction::FinishEarly) => {
                finish(state, chat_id, data).await
            }
            _ => Ok(vec![comment_prompt()]),
        },
    }
}

/// Сверка номера с базой: своя машина участника — стоп; уже приглашали —
/// явное решение; чистый номер — дальше к фото.
async fn resolve_plate(
    state: &BotState,
    chat_id: ChatId,
    mut data: InviteData,
    plate: String,
) -> Result<Vec<Reply>, StorageError> {
    let cars = state.store.get_cars_by_plate(&plate).await?;

    if let Some(owned) = cars.iter().find(|c| c.status != CarStatus::Invitation) {
        state.sessions.delete(chat_id).await;
        log::info!("📨 Invite for {} aborted: plate already in club", plate);
        let mut replies = vec![text("Эта машина уже в клубе, приглашение не требуется")];
        replies.push(car_reply(owned));
        return Ok(replies);
    }

    if let Some(ghost) = cars.iter().find(|c| c.status == CarStatus::Invitation) {
        let history = state.store.get_invitations_by_car(ghost.id).await?;
        data.plate = Some(plate);
        save(state, chat_id, InviteStep::ConfirmDuplicate, data).await;

        let mut lines = vec![format!(
            "Эту машину уже приглашали, записей: {}",
            history.len()
        )];
        for inv in history.iter().take(5) {
            lines.push(invitation_line(inv));
        }
        lines.push("Создать ещё одно приглашение?".to_string());
        return Ok(vec![Reply::Keyboard(lines.join("\n"), duplicate_keyboard())]);
    }

    data.plate = Some(plate);
    save(state, chat_id, InviteStep::Photos, data).await;
    Ok(vec![photos_prompt()])
}

fn car_reply(car: &Car) -> Reply {
    match car.photos.first() {
        Some(file_id) => Reply::Photo {
            file_id: file_id.clone(),
            caption: car_card(car, None),
        },
        None => Reply::Md(car_card(car, None)),
    }
}

async fn finish(
    state: &BotState,
    chat_id: ChatId,
    data: InviteData,
) -> Result<Vec<Reply>, StorageError> {
    if !state.sessions.exists(chat_id).await {
        return Ok(vec![]);
    }
    let Some(plate) = data.plate.clone() else {
        state.sessions.delete(chat_id).await;
        return Ok(vec![text("Что-то пошло не так, начните заново — /invite")]);
    };

    let cars = state.store.get_cars_by_plate(&plate).await?;

    // пока собирали фото, владелец мог успеть вступить сам
    if let Some(owned) = cars.iter().find(|c| c.status != CarStatus::Invitation) {
        state.sessions.delete(chat_id).await;
        return Ok(vec![
            text("Пока вы заполняли приглашение, эта машина уже оказалась в клубе"),
            car_reply(owned),
        ]);
    }

    // машину-приглашение переиспользуем, если она уже заведена
    let existing = cars
        .into_iter()
        .find(|c| c.status == CarStatus::Invitation);
    let car = match existing {
        Some(car) => car,
        None => {
            state
                .store
                .create_car(NewCar {
                    owner_id: None,
                    brand: None,
                    model: None,
                    year: None,
                    color: None,
                    plate: plate.clone(),
                    photos: data.photos.clone(),
                    status: CarStatus::Invitation,
                })
                .await?
        }
    };

    let status = if data.duplicate_confirmed {
        InvitationStatus::ConfirmedDuplicate
    } else {
        InvitationStatus::New
    };
    let invitation = state
        .store
        .create_invitation(NewInvitation {
            car_id: car.id,
            plate: plate.clone(),
            created_by: chat_id.0,
            comment: data.comment,
            photos: data.photos,
            status,
        })
        .await?;

    state.sessions.delete(chat_id).await;
    log::info!("✅ Invitation {} created for plate {}", invitation.id, plate);

    let mut replies = vec![text(format!(
        "📨 Приглашение по номеру {} создано. Спасибо!",
        plate
    ))];
    if data.broadcast && state.notifications.is_enabled(NotifyCategory::Invitation) {
        replies.push(Reply::Broadcast(format!(
            "📨 Замечена машина {} — приглашаем владельца в клуб",
            escape_markdown_v2(&plate)
        )));
    }
    Ok(replies)
}

/// Машина появилась у участника в активном статусе: все записи-приглашения
/// с этим номером и все незакрытые приглашения получают терминальный
/// статус «владелец вступил» со ссылкой на новую машину.
pub async fn reconcile_plate(store: &dyn Storage, car: &Car) -> Result<u32, StorageError> {
    if car.owner_id.is_none() || car.status != CarStatus::Active {
        return Ok(0);
    }
    let mut reconciled = 0;

    for mut other in store.get_cars_by_plate(&car.plate).await? {
        if other.id != car.id && other.status == CarStatus::Invitation {
            other.status = CarStatus::InClub;
            store.update_car(&other).await?;
            reconciled += 1;
        }
    }

    // приглашения ищем по номеру, а не по машине: записи могли
    // разъехаться по разным карточкам
    for mut inv in store.get_invitations_by_plate(&car.plate).await? {
        if !inv.status.is_terminal() {
            inv.status = InvitationStatus::JoinedClub;
            inv.joined_car_id = Some(car.id);
            store.update_invitation(&inv).await?;
            reconciled += 1;
        }
    }

    if reconciled > 0 {
        log::info!("🔁 Plate {}: {} records joined the club", car.plate, reconciled);
    }
    Ok(reconciled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::handle_event;
    use crate::models::{Member, NewMember};
    use crate::storage::memory::MemStorage;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const CHAT: ChatId = ChatId(300);

    async fn seed_member(store: &MemStorage, tg_id: i64) -> Member {
        store
            .create_member(NewMember {
                tg_id,
                username: None,
                first_name: "Олег".to_string(),
                last_name: "Кузнецов".to_string(),
                birth_date: None,
                city: None,
                country: None,
                phone: None,
                about: None,
                photo: None,
                status: MemberStatus::Member,
            })
            .await
            .unwrap()
    }

    async fn feed(state: &BotState, event: FlowEvent<'_>) -> Vec<Reply> {
        handle_event(state, CHAT, event).await.expect("no session")
    }

    #[tokio::test]
    async fn unseen_plate_creates_car_and_invitation() {
        let store = Arc::new(MemStorage::new());
        seed_member(&store, CHAT.0).await;
        let state = BotState::stub(Arc::clone(&store));

        start(&state, CHAT, false).await.unwrap();
        feed(&state, FlowEvent::Text("m001mm78")).await;
        feed(&state, FlowEvent::Photo("spotted_1")).await;
        feed(&state, FlowEvent::Action(CallbackAction::PhotosDone)).await;
        feed(&state, FlowEvent::Text("Видел у вокзала")).await;

        assert!(state.sessions.get(CHAT).await.is_none());

        let cars = store.cars().await;
        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0].plate, "M001MM78");
        assert_eq!(cars[0].status, CarStatus::Invitation);
        assert_eq!(cars[0].owner_id, None);

        let invitations = store.invitations().await;
        assert_eq!(invitations.len(), 1);
        assert_eq!(invitations[0].status, InvitationStatus::New);
        assert_eq!(invitations[0].car_id, cars[0].id);
        assert_eq!(invitations[0].comment.as_deref(), Some("Видел у вокзала"));
    }

    #[tokio::test]
    async fn owned_plate_aborts_without_records() {
        let store = Arc::new(MemStorage::new());
        let owner = seed_member(&store, 900).await;
        seed_member(&store, CHAT.0).await;
        store
            .create_car(NewCar {
                owner_id: Some(owner.id),
                brand: Some("Lada".to_string()),
                model: Some("Vesta".to_string()),
                year: Some(2020),
                color: None,
                plate: "K005KK05".to_string(),
                photos: vec![],
                status: CarStatus::Active,
            })
            .await
            .unwrap();
        let state = BotState::stub(Arc::clone(&store));

        start(&state, CHAT, false).await.unwrap();
        feed(&state, FlowEvent::Text("k005kk05")).await;

        // сценарий прерван, новых записей нет
        assert!(state.sessions.get(CHAT).await.is_none());
        assert_eq!(store.cars().await.len(), 1);
        assert_eq!(store.invitations().await.len(), 0);
    }

    #[tokio::test]
    async fn duplicate_plate_requires_explicit_confirmation() {
        let store = Arc::new(MemStorage::new());
        seed_member(&store, CHAT.0).await;
        let ghost = store
            .create_car(NewCar {
                owner_id: None,
                brand: None,
                model: None,
                year: None,
                color: None,
                plate: "T010TT10".to_string(),
                photos: vec![],
                status: CarStatus::Invitation,
            })
            .await
            .unwrap();
        store
            .create_invitation(NewInvitation {
                car_id: ghost.id,
                plate: "T010TT10".to_string(),
                created_by: 111,
                comment: None,
                photos: vec![],
                status: InvitationStatus::New,
            })
            .await
            .unwrap();
        let state = BotState::stub(Arc::clone(&store));

        start(&state, CHAT, false).await.unwrap();
        feed(&state, FlowEvent::Text("T010TT10")).await;

        // без явного подтверждения шаг стоит на месте
        match state.sessions.get(CHAT).await.unwrap().flow {
            FlowState::Invite { step, .. } => assert_eq!(step, InviteStep::ConfirmDuplicate),
            other => panic!("unexpected flow: {:?}", other),
        }
        feed(&state, FlowEvent::Text("да, создавай")).await;
        match state.sessions.get(CHAT).await.unwrap().flow {
            FlowState::Invite { step, .. } => assert_eq!(step, InviteStep::ConfirmDuplicate),
            other => panic!("unexpected flow: {:?}", other),
        }

        feed(&state, FlowEvent::Action(CallbackAction::ConfirmDuplicate)).await;
        feed(&state, FlowEvent::Action(CallbackAction::FinishEarly)).await;

        // машина переиспользована, приглашений стало два
        assert_eq!(store.cars().await.len(), 1);
        let invitations = store.invitations().await;
        assert_eq!(invitations.len(), 2);
        let second = invitations
            .iter()
            .find(|i| i.created_by == CHAT.0)
            .unwrap();
        assert_eq!(second.status, InvitationStatus::ConfirmedDuplicate);
        assert_eq!(second.car_id, ghost.id);
    }

    #[tokio::test]
    async fn finish_early_skips_remaining_optional_fields() {
        let store = Arc::new(MemStorage::new());
        seed_member(&store, CHAT.0).await;
        let state = BotState::stub(Arc::clone(&store));

        start(&state, CHAT, false).await.unwrap();
        feed(&state, FlowEvent::Text("H008HH08")).await;
        feed(&state, FlowEvent::Action(CallbackAction::FinishEarly)).await;

        let invitations = store.invitations().await;
        assert_eq!(invitations.len(), 1);
        assert_eq!(invitations[0].comment, None);
        assert!(invitations[0].photos.is_empty());
    }

    #[tokio::test]
    async fn bad_plate_reprompts_in_place() {
        let store = Arc::new(MemStorage::new());
        seed_member(&store, CHAT.0).await;
        let state = BotState::stub(Arc::clone(&store));

        start(&state, CHAT, false).await.unwrap();
        feed(&state, FlowEvent::Text("AB 12")).await;
        match state.sessions.get(CHAT).await.unwrap().flow {
            FlowState::Invite { step, data } => {
                assert_eq!(step, InviteStep::Plate);
                assert_eq!(data.plate, None);
            }
            other => panic!("unexpected flow: {:?}", other),
        }
    }
}
