use std::collections::HashMap;
use std::sync::Arc;
use teloxide::types::ChatId;
use tokio::sync::RwLock;

use crate::models::ConversationState;

/// Реестр активных диалогов: не больше одного на пользователя.
/// Запуск нового сценария молча перетирает старый, слияния нет.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<ChatId, ConversationState>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, chat_id: ChatId) -> Option<ConversationState> {
        self.inner.read().await.get(&chat_id).cloned()
    }

    pub async fn set(&self, state: ConversationState) {
        self.inner.write().await.insert(state.chat_id, state);
    }

    /// true, если диалог был и удалён
    pub async fn delete(&self, chat_id: ChatId) -> bool {
        self.inner.write().await.remove(&chat_id).is_some()
    }

    pub async fn exists(&self, chat_id: ChatId) -> bool {
        self.inner.read().await.contains_key(&chat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddCarData, AddCarStep, FlowState, RegData, RegStep};
    use pretty_assertions::assert_eq;

    fn registration(chat_id: ChatId) -> ConversationState {
        ConversationState {
            chat_id,
            flow: FlowState::Registration {
                step: RegStep::City,
                data: RegData {
                    first_name: Some("Иван".to_string()),
                    last_name: Some("Петров".to_string()),
                    ..Default::default()
                },
            },
        }
    }

    #[tokio::test]
    async fn get_set_delete_roundtrip() {
        let store = SessionStore::new();
        let chat = ChatId(10);
        assert_eq!(store.get(chat).await, None);

        store.set(registration(chat)).await;
        assert!(store.exists(chat).await);

        assert!(store.delete(chat).await);
        assert!(!store.delete(chat).await);
        assert_eq!(store.get(chat).await, None);
    }

    #[tokio::test]
    async fn new_flow_replaces_old_without_leaking_fields() {
        let store = SessionStore::new();
        let chat = ChatId(11);
        store.set(registration(chat)).await;

        // стартует другой сценарий — прежние данные не должны просочиться
        store
            .set(ConversationState {
                chat_id: chat,
                flow: FlowState::AddCar {
                    step: AddCarStep::Brand,
                    data: AddCarData::default(),
                },
            })
            .await;

        let state = store.get(chat).await.unwrap();
        match state.flow {
            FlowState::AddCar { step, data } => {
                assert_eq!(step, AddCarStep::Brand);
                assert_eq!(data, AddCarData::default());
            }
            other => panic!("unexpected flow: {:?}", other),
        }
    }

    #[tokio::test]
    async fn users_are_independent() {
        let store = SessionStore::new();
        store.set(registration(ChatId(1))).await;
        store.set(registration(ChatId(2))).await;
        store.delete(ChatId(1)).await;
        assert!(store.exists(ChatId(2)).await);
    }
}
