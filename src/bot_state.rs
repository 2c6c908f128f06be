use std::sync::Arc;
use teloxide::types::ChatId;

use crate::notify::Notifications;
use crate::password::TempPassword;
use crate::rate_limit::RateLimiter;
use crate::sessions::SessionStore;
use crate::storage::Storage;

/// Общее состояние бота: хранилище, диалоги, лимиты, пароль активации.
/// Клонируется дёшево, всё внутри за Arc.
#[derive(Clone)]
pub struct BotState {
    pub store: Arc<dyn Storage>,
    pub sessions: SessionStore,
    pub limiter: RateLimiter,
    pub password: TempPassword,
    pub notifications: Notifications,
    admins: Arc<Vec<i64>>,
}

impl BotState {
    pub fn new(store: Arc<dyn Storage>, notifications: Notifications, admins: Vec<i64>) -> Self {
        Self {
            store,
            sessions: SessionStore::new(),
            limiter: RateLimiter::new(),
            password: TempPassword::new(),
            notifications,
            admins: Arc::new(admins),
        }
    }

    pub fn is_admin(&self, chat_id: ChatId) -> bool {
        self.admins.contains(&chat_id.0)
    }
}

#[cfg(test)]
impl BotState {
    /// Состояние на памяти для тестов сценариев
    pub fn stub(store: Arc<crate::storage::memory::MemStorage>) -> Self {
        Self::new(store, Notifications::disabled(), vec![1])
    }
}
