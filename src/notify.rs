use std::collections::HashSet;
use std::env;
use teloxide::types::ChatId;

/// Категории клубных рассылок
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyCategory {
    Registration,
    Garage,
    Invitation,
}

impl NotifyCategory {
    fn code(&self) -> &'static str {
        match self {
            NotifyCategory::Registration => "registration",
            NotifyCategory::Garage => "garage",
            NotifyCategory::Invitation => "invitation",
        }
    }
}

/// Снимок настроек рассылок, читается один раз на старте.
/// NOTIFY_CATEGORIES — список включённых категорий через запятую,
/// отсутствие переменной означает «все включены».
#[derive(Clone, Debug)]
pub struct Notifications {
    enabled: HashSet<String>,
    all_enabled: bool,
    pub club_chat: Option<ChatId>,
}

impl Notifications {
    pub fn from_env() -> Self {
        let club_chat = env::var("CLUB_CHAT_ID")
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(ChatId);

        match env::var("NOTIFY_CATEGORIES") {
            Ok(raw) => Self {
                enabled: raw
                    .split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
                all_enabled: false,
                club_chat,
            },
            Err(_) => Self {
                enabled: HashSet::new(),
                all_enabled: true,
                club_chat,
            },
        }
    }

    pub fn is_enabled(&self, category: NotifyCategory) -> bool {
        self.all_enabled || self.enabled.contains(category.code())
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            enabled: HashSet::new(),
            all_enabled: false,
            club_chat: None,
        }
    }

    #[cfg(test)]
    pub fn all_on(club_chat: Option<ChatId>) -> Self {
        Self {
            enabled: HashSet::new(),
            all_enabled: true,
            club_chat,
        }
    }
}
