use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitationStatus {
    New,
    Pending,
    ConfirmedDuplicate,
    JoinedClub,
    Deleted,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::New => "new",
            InvitationStatus::Pending => "pending",
            InvitationStatus::ConfirmedDuplicate => "confirmed_duplicate",
            InvitationStatus::JoinedClub => "joined_club",
            InvitationStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(InvitationStatus::New),
            "pending" => Some(InvitationStatus::Pending),
            "confirmed_duplicate" => Some(InvitationStatus::ConfirmedDuplicate),
            "joined_club" => Some(InvitationStatus::JoinedClub),
            "deleted" => Some(InvitationStatus::Deleted),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            InvitationStatus::New => "Новое",
            InvitationStatus::Pending => "В работе",
            InvitationStatus::ConfirmedDuplicate => "Повторное",
            InvitationStatus::JoinedClub => "Владелец вступил",
            InvitationStatus::Deleted => "Удалено",
        }
    }

    /// Терминальные статусы при сверке номеров не трогаем
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvitationStatus::JoinedClub | InvitationStatus::Deleted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub car_id: i64,
    /// Дублируем номер: сверка идёт и между разными записями машин
    pub plate: String,
    pub created_by: i64,
    pub comment: Option<String>,
    pub photos: Vec<String>,
    pub status: InvitationStatus,
    /// Машина участника, к которой привязано закрытое приглашение
    pub joined_car_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub car_id: i64,
    pub plate: String,
    pub created_by: i64,
    pub comment: Option<String>,
    pub photos: Vec<String>,
    pub status: InvitationStatus,
}
