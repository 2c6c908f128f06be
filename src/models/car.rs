use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Статус автомобиля. `Invitation` — машина без владельца, заведена
/// по приглашению; `InClub` — её владелец позже вступил в клуб.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarStatus {
    Active,
    Pending,
    Invitation,
    InClub,
    Left,
    Sold,
    Deleted,
}

impl CarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarStatus::Active => "active",
            CarStatus::Pending => "pending",
            CarStatus::Invitation => "invitation",
            CarStatus::InClub => "in_club",
            CarStatus::Left => "left",
            CarStatus::Sold => "sold",
            CarStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CarStatus::Active),
            "pending" => Some(CarStatus::Pending),
            "invitation" => Some(CarStatus::Invitation),
            "in_club" => Some(CarStatus::InClub),
            "left" => Some(CarStatus::Left),
            "sold" => Some(CarStatus::Sold),
            "deleted" => Some(CarStatus::Deleted),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            CarStatus::Active => "В клубе",
            CarStatus::Pending => "На модерации",
            CarStatus::Invitation => "Приглашение",
            CarStatus::InClub => "Владелец вступил",
            CarStatus::Left => "Покинул клуб",
            CarStatus::Sold => "Продан",
            CarStatus::Deleted => "Удалён",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: i64,
    /// None — машина без владельца (заведена по приглашению)
    pub owner_id: Option<i64>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    /// Всегда в нормализованном виде: A-Z0-9, верхний регистр
    pub plate: String,
    pub photos: Vec<String>,
    pub status: CarStatus,
    pub created_at: DateTime<Utc>,
}

impl Car {
    pub fn short_title(&self) -> String {
        match (&self.brand, &self.model) {
            (Some(b), Some(m)) => format!("{} {} · {}", b, m, self.plate),
            (Some(b), None) => format!("{} · {}", b, self.plate),
            _ => self.plate.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCar {
    pub owner_id: Option<i64>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub plate: String,
    pub photos: Vec<String>,
    pub status: CarStatus,
}
