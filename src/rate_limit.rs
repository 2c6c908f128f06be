use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use teloxide::types::ChatId;
use tokio::sync::Mutex;

use crate::Command;

/// Ответ при срабатывании лимита — всегда один и тот же
pub const RATE_LIMIT_MESSAGE: &str =
    "⏳ Слишком много запросов, подождите немного и попробуйте снова";

/// Категории запросов, у каждой своё окно и свой потолок
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateCategory {
    General,
    Registration,
    Search,
    Callback,
}

impl RateCategory {
    fn limits(self) -> (usize, Duration) {
        match self {
            RateCategory::General => (20, Duration::from_secs(60)),
            RateCategory::Registration => (4, Duration::from_secs(60)),
            RateCategory::Search => (10, Duration::from_secs(60)),
            RateCategory::Callback => (30, Duration::from_secs(60)),
        }
    }
}

/// Статическая таблица команда → категория. Всё, чего в таблице нет,
/// считается General.
pub fn category_for(cmd: &Command) -> RateCategory {
    match cmd {
        Command::Reg | Command::Addcar | Command::Invite => RateCategory::Registration,
        Command::Search => RateCategory::Search,
        _ => RateCategory::General,
    }
}

/// Скользящее окно: список отметок времени внутри хвостового интервала
#[derive(Debug, Default)]
struct Window {
    hits: Vec<Instant>,
}

impl Window {
    /// Сначала чистим устаревшие отметки, потом решаем. Отказ ничего
    /// не записывает.
    fn admit(&mut self, now: Instant, max: usize, window: Duration) -> bool {
        self.hits
            .retain(|t| now.saturating_duration_since(*t) < window);
        if self.hits.len() >= max {
            return false;
        }
        self.hits.push(now);
        true
    }

    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        self.hits
            .iter()
            .all(|t| now.saturating_duration_since(*t) >= window)
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<(ChatId, RateCategory), Window>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn check(&self, chat_id: ChatId, category: RateCategory) -> bool {
        self.check_at(chat_id, category, Instant::now()).await
    }

    async fn check_at(&self, chat_id: ChatId, category: RateCategory, now: Instant) -> bool {
        let (max, window) = category.limits();
        let mut windows = self.windows.lock().await;
        windows
            .entry((chat_id, category))
            .or_default()
            .admit(now, max, window)
    }

    /// Админский сброс: мгновенно очищает все окна пользователя
    pub async fn reset(&self, chat_id: ChatId) {
        let mut windows = self.windows.lock().await;
        windows.retain(|(chat, _), _| *chat != chat_id);
    }

    /// Периодическая уборка полностью протухших ключей, чтобы карта
    /// не росла бесконечно. Запускается фоновой задачей из main.
    pub async fn sweep(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|(_, category), w| {
            let (_, window) = category.limits();
            !w.is_stale(now, window)
        });
        log::debug!("🧹 Rate windows swept: {} -> {}", before, windows.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_admits_up_to_cap_then_rejects() {
        let mut w = Window::default();
        let start = Instant::now();
        let window = Duration::from_millis(1000);
        assert!(w.admit(start, 3, window));
        assert!(w.admit(start + Duration::from_millis(10), 3, window));
        assert!(w.admit(start + Duration::from_millis(20), 3, window));
        assert!(!w.admit(start + Duration::from_millis(30), 3, window));
        // отказ не записывается: после сдвига окна место освобождается
        assert!(w.admit(start + Duration::from_millis(1100), 3, window));
    }

    #[test]
    fn window_prunes_old_entries_on_read() {
        let mut w = Window::default();
        let start = Instant::now();
        let window = Duration::from_millis(100);
        assert!(w.admit(start, 1, window));
        assert!(!w.admit(start + Duration::from_millis(50), 1, window));
        assert!(w.admit(start + Duration::from_millis(150), 1, window));
        assert_eq!(w.hits.len(), 1);
    }

    #[tokio::test]
    async fn users_and_categories_do_not_interact() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..4 {
            limiter
                .check_at(ChatId(1), RateCategory::Registration, now)
                .await;
        }
        assert!(
            !limiter
                .check_at(ChatId(1), RateCategory::Registration, now)
                .await
        );
        // другой пользователь и другая категория не задеты
        assert!(
            limiter
                .check_at(ChatId(2), RateCategory::Registration, now)
                .await
        );
        assert!(limiter.check_at(ChatId(1), RateCategory::Search, now).await);
    }

    #[tokio::test]
    async fn reset_clears_all_windows_for_user() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..4 {
            limiter
                .check_at(ChatId(7), RateCategory::Registration, now)
                .await;
        }
        assert!(
            !limiter
                .check_at(ChatId(7), RateCategory::Registration, now)
                .await
        );
        limiter.reset(ChatId(7)).await;
        assert!(
            limiter
                .check_at(ChatId(7), RateCategory::Registration, now)
                .await
        );
    }
}
