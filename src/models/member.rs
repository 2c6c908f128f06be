use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Статус участника клуба
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    New,
    NoVehicle,
    Member,
    Active,
    Left,
    Banned,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::New => "new",
            MemberStatus::NoVehicle => "no_vehicle",
            MemberStatus::Member => "member",
            MemberStatus::Active => "active",
            MemberStatus::Left => "left",
            MemberStatus::Banned => "banned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(MemberStatus::New),
            "no_vehicle" => Some(MemberStatus::NoVehicle),
            "member" => Some(MemberStatus::Member),
            "active" => Some(MemberStatus::Active),
            "left" => Some(MemberStatus::Left),
            "banned" => Some(MemberStatus::Banned),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MemberStatus::New => "Новичок",
            MemberStatus::NoVehicle => "Без авто",
            MemberStatus::Member => "Участник",
            MemberStatus::Active => "Актив",
            MemberStatus::Left => "Покинул клуб",
            MemberStatus::Banned => "Заблокирован",
        }
    }

    pub fn all() -> [MemberStatus; 6] {
        [
            MemberStatus::New,
            MemberStatus::NoVehicle,
            MemberStatus::Member,
            MemberStatus::Active,
            MemberStatus::Left,
            MemberStatus::Banned,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub tg_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub about: Option<String>,
    pub photo: Option<String>,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Данные для вставки: id и created_at назначает хранилище
#[derive(Debug, Clone)]
pub struct NewMember {
    pub tg_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub about: Option<String>,
    pub photo: Option<String>,
    pub status: MemberStatus,
}
